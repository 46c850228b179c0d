use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::analytics::AnalyticsEngine;
use crate::cache::{KeyStatus, SnapshotCache};
use crate::error::{AppError, Result};
use crate::types::{BestDeals, CacheKey, MarketStats, Prediction, PropertyScore, SimilarListing};

#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<SnapshotCache>,
    pub engine: Arc<AnalyticsEngine>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/market/:source", get(get_market))
        .route("/cache/status", get(get_cache_status))
        .route("/cache/refresh", post(post_cache_refresh))
        .route("/cache/clear", post(post_cache_clear))
        .route("/cache/:source", delete(delete_cache_key))
        .route("/analytics/score/:listing_id", get(get_score))
        .route("/analytics/predict", get(get_predict))
        .route("/analytics/similar/:listing_id", get(get_similar))
        .route("/analytics/best-deals", get(get_best_deals))
        .with_state(state)
}

/// Resolve an optional `?source=` param; absent means the combined view.
fn parse_key(source: Option<&str>) -> Result<CacheKey> {
    match source {
        None => Ok(CacheKey::Combined),
        Some(s) => s
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("unknown source '{s}'"))),
    }
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SourceQuery {
    pub source: Option<String>,
}

#[derive(Deserialize)]
pub struct PredictQuery {
    pub surface: Option<f64>,
    pub rooms: Option<u32>,
    pub sector: Option<String>,
    pub source: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "cache_ttl_secs": state.cache.ttl_secs(),
    }))
}

async fn get_market(
    State(state): State<ApiState>,
    Path(source): Path<String>,
) -> Result<Json<MarketStats>> {
    let key = parse_key(Some(&source))?;
    let snapshot = state.cache.get(key).await?;
    Ok(Json(snapshot.stats.clone()))
}

async fn get_cache_status(State(state): State<ApiState>) -> Json<Vec<KeyStatus>> {
    Json(state.cache.status())
}

async fn post_cache_refresh(
    State(state): State<ApiState>,
    Query(params): Query<SourceQuery>,
) -> Result<Json<serde_json::Value>> {
    match params.source.as_deref() {
        Some(s) => {
            let key = parse_key(Some(s))?;
            state.cache.refresh(key).await?;
            info!(%key, "manual refresh completed");
            Ok(Json(serde_json::json!({ "refreshed": key.to_string() })))
        }
        None => {
            state.cache.refresh_all().await;
            info!("manual refresh of all keys completed");
            Ok(Json(serde_json::json!({ "refreshed": "all" })))
        }
    }
}

async fn post_cache_clear(State(state): State<ApiState>) -> Json<serde_json::Value> {
    state.cache.clear();
    Json(serde_json::json!({ "cleared": true }))
}

async fn delete_cache_key(
    State(state): State<ApiState>,
    Path(source): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let key = parse_key(Some(&source))?;
    state.cache.invalidate(key);
    Ok(Json(serde_json::json!({ "invalidated": key.to_string() })))
}

async fn get_score(
    State(state): State<ApiState>,
    Path(listing_id): Path<String>,
    Query(params): Query<SourceQuery>,
) -> Result<Json<PropertyScore>> {
    let key = parse_key(params.source.as_deref())?;
    let score = state.engine.score_property(key, &listing_id).await?;
    Ok(Json(score))
}

async fn get_predict(
    State(state): State<ApiState>,
    Query(params): Query<PredictQuery>,
) -> Result<Json<Prediction>> {
    let key = parse_key(params.source.as_deref())?;
    let surface = params
        .surface
        .ok_or_else(|| AppError::InvalidInput("missing required param 'surface'".to_string()))?;
    let rooms = params
        .rooms
        .ok_or_else(|| AppError::InvalidInput("missing required param 'rooms'".to_string()))?;
    let prediction = state
        .engine
        .predict_price(key, surface, rooms, params.sector.as_deref())
        .await?;
    Ok(Json(prediction))
}

async fn get_similar(
    State(state): State<ApiState>,
    Path(listing_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<SimilarListing>>> {
    let key = parse_key(params.source.as_deref())?;
    let similar = state.engine.find_similar(key, &listing_id, params.limit).await?;
    Ok(Json(similar))
}

async fn get_best_deals(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<BestDeals>> {
    let key = parse_key(params.source.as_deref())?;
    let deals = state.engine.best_deals(key, params.limit).await?;
    Ok(Json(deals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_defaults_to_combined() {
        assert_eq!(parse_key(None).unwrap(), CacheKey::Combined);
    }

    #[test]
    fn known_sources_parse() {
        assert_eq!(
            parse_key(Some("proimobil")).unwrap(),
            CacheKey::Source(crate::types::Source::Proimobil)
        );
        assert_eq!(parse_key(Some("combined")).unwrap(), CacheKey::Combined);
    }

    #[test]
    fn unknown_source_is_invalid_input() {
        let err = parse_key(Some("zillow")).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
