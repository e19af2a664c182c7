#![allow(dead_code)]

use axum::Router;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use pubregistry::importers::PubmedClient;
use pubregistry::{db, router, AppState};

/// Nothing listens here, so pubmed imports in tests fail with a connection error.
pub const UNREACHABLE_PUBMED: &str = "http://127.0.0.1:9/eutils";

/// Create a migrated test database pool, or `None` when `DATABASE_URL` is unset
pub async fn create_test_pool() -> Option<Pool<Postgres>> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to create test database pool");

    db::migrate(&pool).await.expect("Failed to run migrations");
    Some(pool)
}

/// Pool that never connects, for requests rejected before any query runs
pub fn create_lazy_pool() -> Pool<Postgres> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy("postgres://registry@127.0.0.1:1/registry")
        .expect("Failed to create lazy pool")
}

/// Create the application router for testing
pub fn create_test_app(pool: Pool<Postgres>) -> Router {
    router(AppState::new(pool, PubmedClient::new(UNREACHABLE_PUBMED)))
}
