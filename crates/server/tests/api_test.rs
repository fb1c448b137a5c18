//! In-process integration tests for the HTTP API.
//!
//! Uses Axum's tower integration, so no TCP listener is started. Each test
//! builds its app over a throwaway on-disk SQLite fixture.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rusqlite::Connection;
use scorecard::{Catalog, QueryEngine, Store};
use scorecard_server::build_app;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot()

/// Fixture matching the documented scenario: Acme College (7) with a 2010
/// row, Zenith Institute (3) with 2010 and 2011 rows, and an empty 2012.
/// The returned `TempDir` guard must outlive the app: the engine reopens the
/// file on every request.
fn fixture_app() -> (axum::Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE entity (
            entity_id INTEGER PRIMARY KEY,
            name TEXT,
            city TEXT
        );
        CREATE TABLE "2010" (entity_id INTEGER, enrollment INTEGER);
        CREATE TABLE "2011" (entity_id INTEGER, enrollment INTEGER);
        CREATE TABLE "2012" (entity_id INTEGER, enrollment INTEGER);
        INSERT INTO entity VALUES (7, 'Acme College', 'Springfield');
        INSERT INTO entity VALUES (3, 'Zenith Institute', 'Shelbyville');
        INSERT INTO "2010" VALUES (7, 100);
        INSERT INTO "2010" VALUES (3, 250);
        INSERT INTO "2011" VALUES (3, 260);
        "#,
    )
    .unwrap();

    let store = Store::open(&path);
    let catalog = Arc::new(Catalog::build(&store).unwrap());
    (build_app(QueryEngine::new(store, catalog)), dir)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn entities_listing_is_name_ordered() {
    let (app, _guard) = fixture_app();
    let (status, body) = get(app, "/data/entities").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "id": 7, "name": "Acme College" },
            { "id": 3, "name": "Zenith Institute" },
        ])
    );
}

#[tokio::test]
async fn merged_entity_nests_periods_and_global() {
    let (app, _guard) = fixture_app();
    let (status, body) = get(app, "/data/entities/3").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["2010"]["enrollment"], json!(250));
    assert_eq!(body["2011"]["enrollment"], json!(260));
    assert_eq!(body["global"]["city"], json!("Shelbyville"));
    // The empty 2012 relation holds no row for anyone: omitted, not null.
    assert!(body.get("2012").is_none());
}

#[tokio::test]
async fn entity_global_endpoint_wraps_record() {
    let (app, _guard) = fixture_app();
    let (status, body) = get(app, "/data/entities/7/global").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["global"]["city"], json!("Springfield"));
    assert_eq!(body["global"]["entity_id"], json!(7));
}

#[tokio::test]
async fn entity_period_single_and_range_forms() {
    let (app, _guard) = fixture_app();

    let (status, body) = get(app.clone(), "/data/entities/7/period/2010").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["2010"]["enrollment"], json!(100));

    let (status, body) = get(app, "/data/entities/7/period?min=2010&max=2012").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_eq!(body["2010"]["enrollment"], json!(100));
}

#[tokio::test]
async fn attribute_definitions_carry_type_and_scope() {
    let (app, _guard) = fixture_app();
    let (status, body) = get(app, "/data/attributes").await;

    assert_eq!(status, StatusCode::OK);
    let defs = body.as_array().unwrap();
    assert!(defs.contains(&json!({
        "name": "enrollment", "type": "INTEGER", "scope": "period"
    })));
    assert!(defs.contains(&json!({
        "name": "city", "type": "TEXT", "scope": "global"
    })));
}

#[tokio::test]
async fn attribute_over_periods_includes_empty_period_keys() {
    let (app, _guard) = fixture_app();
    let (status, body) = get(app, "/data/attributes/enrollment/period?min=2010&max=2012").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["2011"], json!([{ "entity_id": 3, "value": 260 }]));
    assert_eq!(body["2012"], json!([]));
    assert_eq!(body["2010"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn attribute_global_uses_capitalized_key() {
    let (app, _guard) = fixture_app();
    let (status, body) = get(app, "/data/attributes/city/global").await;

    assert_eq!(status, StatusCode::OK);
    let values = body["Global"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert!(values.contains(&json!({ "entity_id": 7, "value": "Springfield" })));
}

#[tokio::test]
async fn invalid_parameters_are_all_404() {
    let (app, _guard) = fixture_app();

    for uri in [
        "/data/entities/99",                                  // unknown id
        "/data/entities/seven",                               // non-integer id
        "/data/entities/7/period/1999",                       // unknown period
        "/data/entities/7/period?min=2011&max=2010",          // inverted range
        "/data/entities/7/period?max=2011",                   // missing min
        "/data/entities/7/period?min=2010&max=2015",          // unknown max
        "/data/attributes/no_such_attr/global",               // unknown attribute
        "/data/attributes/enrollment/period?min=2010&max=2015", // unknown max
        "/data/attributes/enrollment/period/1999",            // unknown period
    ] {
        let (status, _) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "uri: {uri}");
    }
}

#[tokio::test]
async fn single_absent_period_is_404() {
    let (app, _guard) = fixture_app();
    // Acme has no 2011 row; the sole requested record is absent.
    let (status, _) = get(app, "/data/entities/7/period/2011").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_are_idempotent() {
    let (app, _guard) = fixture_app();
    let (_, first) = get(app.clone(), "/data/entities/3").await;
    let (_, second) = get(app, "/data/entities/3").await;
    assert_eq!(first, second);
}
