//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{invalidate_product_cache, CacheService};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, ExistsResponse, GetResponse, HealthResponse, IncrRequest,
    IncrResponse, MgetRequest, MgetResponse, MsetRequest, MsetResponse, SetRequest, SetResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheService>,
}

impl AppState {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Builds the cache selected by configuration and wraps it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheService::from_config(config).await?;
        Ok(Self::new(Arc::new(cache)))
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl
        .map(Duration::from_secs)
        .unwrap_or_else(|| req.class.unwrap_or_default().ttl());
    state.cache.set(&req.key, &req.value, ttl).await;

    Ok(Json(SetResponse::new(req.key, ttl.as_secs())))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get::<Value>(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key).await;
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<ExistsResponse> {
    let exists = state.cache.exists(&key).await;
    let ttl = if exists {
        state.cache.ttl(&key).await.map(|ttl| ttl.as_secs())
    } else {
        None
    };

    Json(ExistsResponse { key, exists, ttl })
}

/// Handler for POST /incr/:key
///
/// The body is optional; without one the counter goes up by one.
pub async fn incr_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Option<Json<IncrRequest>>,
) -> Json<IncrResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let result = state.cache.increment(&key, req.amount).await;

    Json(IncrResponse::new(key, result))
}

/// Handler for POST /mset
pub async fn mset_handler(
    State(state): State<AppState>,
    Json(req): Json<MsetRequest>,
) -> Result<Json<MsetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let items = req.into_items();
    let count = items.len();
    state.cache.set_multiple(items).await;

    Ok(Json(MsetResponse { count }))
}

/// Handler for POST /mget
pub async fn mget_handler(
    State(state): State<AppState>,
    Json(req): Json<MgetRequest>,
) -> Result<Json<MgetResponse>> {
    if req.keys.is_empty() {
        return Err(CacheError::InvalidRequest(
            "At least one key is required".to_string(),
        ));
    }

    let values = state.cache.get_multiple::<Value, _>(&req.keys).await;
    Ok(Json(MgetResponse { values }))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::new("Cache cleared", None))
}

#[derive(Debug, Deserialize)]
pub struct InvalidateParams {
    pub slug: Option<String>,
}

/// Handler for DELETE /invalidate/product/:id
pub async fn invalidate_product_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<InvalidateParams>,
) -> Json<ClearResponse> {
    let removed = invalidate_product_cache(&state.cache, id, params.slug.as_deref()).await;
    Json(ClearResponse::new(
        format!("Product {} invalidated", id),
        Some(removed),
    ))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.cache.stats(),
        durable_active: state.cache.is_durable_active(),
        connection: state.cache.connection_state(),
    })
}

/// Handler for GET /health
///
/// Answers 503 when a configured durable backend does not respond, even
/// though data requests are still being served from the fallback store.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if !state.cache.has_durable_backend() {
        return (StatusCode::OK, Json(HealthResponse::memory_only()));
    }

    let backend = state.cache.health_check().await;
    let response = HealthResponse::with_backend(backend, state.cache.connection_state());
    let status = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
