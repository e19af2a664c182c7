//! Requests that are answered without touching the database.

mod common;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

fn setup() -> TestServer {
    let app = common::create_test_app(common::create_lazy_pool());
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_root() {
    let server = setup();

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Publication Registry API");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let server = setup();

    let response = server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();

    let doc: serde_json::Value = response.json();
    let paths = doc["paths"].as_object().expect("paths object");
    for path in [
        "/people",
        "/people/{id}",
        "/publications",
        "/publications/{pubid}",
        "/publications/fetch_import_data",
    ] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
}

#[tokio::test]
async fn test_fetch_import_data_unknown_datasource() {
    let server = setup();

    let response = server
        .get("/publications/fetch_import_data?datasource=scopus&sourceid=1")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], 422);
    assert!(body["error"]["msg"].as_str().unwrap().contains("scopus"));
    assert!(body.get("publication").is_none());
}

#[tokio::test]
async fn test_fetch_import_data_requires_parameters() {
    let server = setup();

    let response = server.get("/publications/fetch_import_data").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["msg"].as_str().unwrap().contains("datasource"));

    let response = server
        .get("/publications/fetch_import_data?datasource=pubmed")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["msg"].as_str().unwrap().contains("sourceid"));
}

#[tokio::test]
async fn test_fetch_import_data_none_is_not_importable() {
    let server = setup();

    let response = server
        .get("/publications/fetch_import_data?datasource=none&sourceid=1")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_fetch_import_data_unreachable_source() {
    let server = setup();

    let response = server
        .get("/publications/fetch_import_data?datasource=pubmed&sourceid=25505574")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["msg"].as_str().unwrap().contains("pubmed"));
}

#[tokio::test]
async fn test_create_publication_rejects_unknown_datasource() {
    let server = setup();

    let response = server.post("/publications?datasource=crossref").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server.post("/publications?datasource=pubmed").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_person_requires_last_name() {
    let server = setup();

    let response = server
        .post("/people")
        .json(&json!({"person": {"first_name": "Anna"}}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["msg"], "Could not create the person");
    assert_eq!(body["error"]["errors"]["last_name"][0], "can't be blank");
}

#[tokio::test]
async fn test_create_person_rejects_bad_orcid() {
    let server = setup();

    let response = server
        .post("/people")
        .json(&json!({"person": {"last_name": "Svensson", "orcid": "invalid-orcid"}}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: serde_json::Value = response.json();
    assert!(body["error"]["errors"]["orcid"].is_array());
}

#[tokio::test]
async fn test_non_numeric_ids_are_bad_requests() {
    let server = setup();

    for path in ["/people/abc", "/publications/abc"] {
        let response = server.get(path).await;
        response.assert_status_bad_request();

        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], 400, "{}", path);
        assert!(body["error"]["msg"].as_str().unwrap().contains("abc"));
    }

    let response = server
        .put("/publications/abc")
        .json(&json!({"publication": {}}))
        .await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], 400);
}

#[tokio::test]
async fn test_malformed_json_bodies_use_error_envelope() {
    let server = setup();

    // Valid JSON without the `person` wrapper
    let response = server.post("/people").json(&json!({})).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], 422);
    assert!(body["error"]["msg"].as_str().unwrap().contains("person"));

    // Not JSON at all
    let response = server
        .post("/people")
        .bytes(Bytes::from_static(b"{not json"))
        .content_type("application/json")
        .await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], 400);

    // Missing content type
    let response = server.put("/people/1").text("{}").await;
    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], 415);
}

#[tokio::test]
async fn test_bad_query_strings_use_error_envelope() {
    let server = setup();

    let response = server.get("/publications?drafts=yes").await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["msg"].is_string());
}

#[tokio::test]
async fn test_publication_paging_is_validated() {
    let server = setup();

    let response = server.get("/publications?limit=-1").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["errors"]["limit"].is_array());

    let response = server.get("/publications?offset=-5").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["errors"]["offset"].is_array());

    let response = server.get("/publications?limit=5000").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_error_body_is_json() {
    let app = common::create_test_app(common::create_lazy_pool());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/publications/fetch_import_data?datasource=scopus&sourceid=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["msg"], "Unknown datasource: scopus");
}
