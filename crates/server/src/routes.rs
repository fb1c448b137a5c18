//! Axum route handlers for the read-only data API.
//!
//! Every handler validates through the catalog (inside the engine) before
//! any query runs, and runs the synchronous engine on the blocking thread
//! pool. Entity ids arrive as path strings and are parsed here; anything
//! that is not a known integer id is a plain 404, the same answer given for
//! every other invalid parameter.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use scorecard::{AttrMap, AttributeDef, AttributeValue, EntityRef, MergedEntity, QueryEngine};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// `?min=&max=` form of the range endpoints. A missing `min` is a
/// validation failure, surfaced as 404 like every other invalid parameter.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub min: Option<String>,
    pub max: Option<String>,
}

/// Wrapper for the global projection of an entity.
#[derive(Debug, Serialize)]
pub struct GlobalRecord {
    pub global: AttrMap,
}

/// Wrapper for global attribute values. The capitalized key is part of the
/// published wire format; clients match on it exactly.
#[derive(Debug, Serialize)]
pub struct GlobalValues {
    #[serde(rename = "Global")]
    pub global: Vec<AttributeValue>,
}

/// Runs a synchronous engine operation on the blocking pool.
async fn run_query<T, F>(engine: QueryEngine, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(QueryEngine) -> scorecard::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(engine))
        .await
        .map_err(|_| ApiError::internal("query task failed"))?
        .map_err(ApiError::from)
}

fn parse_entity_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

/// `GET /data/entities`: all entities, display-name ascending.
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EntityRef>>, ApiError> {
    let engine = state.engine.clone();
    Ok(Json(run_query(engine, |e| e.list_entities()).await?))
}

/// `GET /data/entities/{id}`: merged global and per-period record.
pub async fn entity_merged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MergedEntity>, ApiError> {
    let id = parse_entity_id(&id)?;
    let engine = state.engine.clone();
    Ok(Json(run_query(engine, move |e| e.entity_merged(id)).await?))
}

/// `GET /data/entities/{id}/global`: global projection only.
pub async fn entity_global(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GlobalRecord>, ApiError> {
    let id = parse_entity_id(&id)?;
    let engine = state.engine.clone();
    let global = run_query(engine, move |e| e.entity_global(id)).await?;
    Ok(Json(GlobalRecord { global }))
}

/// `GET /data/entities/{id}/period/{min}`: single-period record.
pub async fn entity_period_single(
    State(state): State<Arc<AppState>>,
    Path((id, min)): Path<(String, String)>,
) -> Result<Json<BTreeMap<String, AttrMap>>, ApiError> {
    let id = parse_entity_id(&id)?;
    let engine = state.engine.clone();
    Ok(Json(
        run_query(engine, move |e| e.entity_periods(id, &min, None)).await?,
    ))
}

/// `GET /data/entities/{id}/period?min=&max=`: inclusive period range.
pub async fn entity_period_range(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, AttrMap>>, ApiError> {
    let id = parse_entity_id(&id)?;
    let min = range.min.ok_or_else(ApiError::not_found)?;
    let engine = state.engine.clone();
    Ok(Json(
        run_query(engine, move |e| {
            e.entity_periods(id, &min, range.max.as_deref())
        })
        .await?,
    ))
}

/// `GET /data/attributes`: every declared attribute with type and scope.
pub async fn attribute_definitions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AttributeDef>>, ApiError> {
    let engine = state.engine.clone();
    Ok(Json(run_query(engine, |e| e.attribute_definitions()).await?))
}

/// `GET /data/attributes/{name}/period/{min}`: one period's values.
pub async fn attribute_period_single(
    State(state): State<Arc<AppState>>,
    Path((name, min)): Path<(String, String)>,
) -> Result<Json<BTreeMap<String, Vec<AttributeValue>>>, ApiError> {
    let engine = state.engine.clone();
    Ok(Json(
        run_query(engine, move |e| e.attribute_over_periods(&name, &min, None)).await?,
    ))
}

/// `GET /data/attributes/{name}/period?min=&max=`: values over a range.
pub async fn attribute_period_range(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, Vec<AttributeValue>>>, ApiError> {
    let min = range.min.ok_or_else(ApiError::not_found)?;
    let engine = state.engine.clone();
    Ok(Json(
        run_query(engine, move |e| {
            e.attribute_over_periods(&name, &min, range.max.as_deref())
        })
        .await?,
    ))
}

/// `GET /data/attributes/{name}/global`: non-null global values.
pub async fn attribute_global(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<GlobalValues>, ApiError> {
    let engine = state.engine.clone();
    let global = run_query(engine, move |e| e.attribute_global(&name)).await?;
    Ok(Json(GlobalValues { global }))
}
