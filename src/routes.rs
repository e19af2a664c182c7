use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Publication Registry API",
        description = "People, publications and their department affiliations"
    ),
    paths(
        handlers::people::list_people,
        handlers::people::get_person,
        handlers::people::create_person,
        handlers::people::update_person,
        handlers::publications::list_publications,
        handlers::publications::get_publication,
        handlers::publications::create_publication,
        handlers::publications::update_publication,
        handlers::publications::delete_publication,
        handlers::publications::fetch_import_data,
    ),
    tags(
        (name = "people", description = "Person search and maintenance"),
        (name = "publications", description = "Publication drafts, updates and import")
    )
)]
pub struct ApiDoc;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Publication Registry API" }))
        // People routes
        .route("/people", get(handlers::list_people).post(handlers::create_person))
        .route("/people/{id}", get(handlers::get_person).put(handlers::update_person))
        // Publication routes
        .route(
            "/publications",
            get(handlers::list_publications).post(handlers::create_publication),
        )
        .route(
            "/publications/fetch_import_data",
            get(handlers::fetch_import_data),
        )
        .route(
            "/publications/{pubid}",
            get(handlers::get_publication)
                .put(handlers::update_publication)
                .delete(handlers::delete_publication),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
