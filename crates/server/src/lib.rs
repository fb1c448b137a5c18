//! # scorecard-server
//!
//! Read-only HTTP surface over the scorecard query engine.
//!
//! The engine and its catalog are built by the binary before the listener
//! starts; this crate only wires handlers to routes. All endpoints are GET
//! and all failures surface as 404 (invalid or missing) or 500 (store
//! failure after validation).
//!
//! ## Endpoints
//!
//! - `GET /data/entities`: entity listing
//! - `GET /data/entities/{id}`: merged global + period record
//! - `GET /data/entities/{id}/global`: global projection
//! - `GET /data/entities/{id}/period/{min}` and `/period?min=&max=`
//! - `GET /data/attributes`: attribute definitions
//! - `GET /data/attributes/{name}/period/{min}` and `/period?min=&max=`
//! - `GET /data/attributes/{name}/global`

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use scorecard::QueryEngine;

use crate::state::AppState;

/// Builds the router over an engine whose catalog is already constructed.
pub fn build_app(engine: QueryEngine) -> Router {
    let state = Arc::new(AppState::new(engine));
    Router::new()
        .route("/data/entities", get(routes::list_entities))
        .route("/data/entities/:id", get(routes::entity_merged))
        .route("/data/entities/:id/global", get(routes::entity_global))
        .route(
            "/data/entities/:id/period",
            get(routes::entity_period_range),
        )
        .route(
            "/data/entities/:id/period/:min",
            get(routes::entity_period_single),
        )
        .route("/data/attributes", get(routes::attribute_definitions))
        .route(
            "/data/attributes/:name/period",
            get(routes::attribute_period_range),
        )
        .route(
            "/data/attributes/:name/period/:min",
            get(routes::attribute_period_single),
        )
        .route(
            "/data/attributes/:name/global",
            get(routes::attribute_global),
        )
        .with_state(state)
}
