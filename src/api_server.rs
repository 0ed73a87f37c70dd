// Axum API Server Module
//
// Purpose: thin HTTP adapter over ValidationEngine + ParcelRegistry
// The pipeline is blocking (weather fetch, rayon) so handlers run it on
// the blocking thread pool.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::classifier::Decision;
use crate::config::EngineConfig;
use crate::engine::{ValidationEngine, ValidationRequest};
use crate::error::ValidationError;
use crate::overlap::{ParcelBoundary, ParcelRegistry, StoredBoundary};
use crate::weather::{DateRange, GeoPoint};

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValidationEngine>,
    pub registry: Arc<ParcelRegistry>,
    pub cache: Cache<String, serde_json::Value>,
}

impl AppState {
    /// Load catalog + model and connect the weather source
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        tracing::info!("Initializing validation engine...");
        let engine = ValidationEngine::from_config(config)?;
        Ok(Self::from_engine(engine))
    }

    pub fn from_engine(engine: ValidationEngine) -> Self {
        tracing::info!("Initializing Moka cache...");
        let cache = Cache::builder()
            .max_capacity(10_000) // 10K entries
            .time_to_live(Duration::from_secs(300)) // 5 min TTL
            .build();

        Self {
            engine: Arc::new(engine),
            registry: Arc::new(ParcelRegistry::new()),
            cache,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Land-use validation
        .route("/api/validate", post(validate_parcel))

        // Crop catalog + recommendations
        .route("/api/crops", get(list_crops))
        .route("/api/crops/recommend", post(recommend_crops))

        // Overlap + accepted parcels
        .route("/api/overlap/check", post(check_overlap))
        .route("/api/parcels", post(register_parcel))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/:id/resolve", post(resolve_alert))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize, serde::Serialize)]
pub struct RecommendRequest {
    pub location: GeoPoint,
    #[serde(default)]
    pub explicit_date_range: Option<DateRange>,
    #[serde(default)]
    pub vegetation_mean: f64,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OverlapCheckRequest {
    pub new_boundary: StoredBoundary,
    /// Checked against the accepted-parcel registry when absent
    #[serde(default)]
    pub existing_boundaries: Option<Vec<StoredBoundary>>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterParcelRequest {
    pub id: String,
    pub geometry: serde_json::Value,
    /// Land-use decision the parcel received; FAIL parcels are not accepted
    pub decision: Decision,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub resolved: Option<bool>,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "crops": state.engine.catalog().len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn validate_parcel(
    State(state): State<AppState>,
    Json(payload): Json<ValidationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = state.engine.clone();

    // CPU-bound + blocking weather fetch: run in blocking thread pool
    let report = tokio::task::spawn_blocking(move || engine.validate(&payload))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    let body = serde_json::to_value(&report).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(body))
}

async fn list_crops(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let crops = serde_json::to_value(state.engine.catalog().profiles())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({
        "count": state.engine.catalog().len(),
        "crops": crops,
    })))
}

async fn recommend_crops(
    State(state): State<AppState>,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cache_key = format!(
        "recommend:{}",
        serde_json::to_string(&payload).map_err(|e| AppError::Internal(e.to_string()))?
    );

    // Check cache
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let engine = state.engine.clone();
    let (weather, ranked) = tokio::task::spawn_blocking(move || {
        engine.recommend(
            payload.location,
            payload.explicit_date_range,
            payload.vegetation_mean,
            payload.top_n,
        )
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let result = serde_json::json!({
        "weather": weather,
        "recommended_crops": ranked,
    });

    // Store in cache
    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

async fn check_overlap(
    State(state): State<AppState>,
    Json(payload): Json<OverlapCheckRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = state.engine.clone();
    let registry = state.registry.clone();

    let alerts = tokio::task::spawn_blocking(move || {
        let detector = engine.overlap_detector();
        let new = &payload.new_boundary;
        match &payload.existing_boundaries {
            Some(existing) => detector.check_geojson(&new.id, &new.geometry, existing),
            None => {
                let boundary = ParcelBoundary::from_geojson(new.id.clone(), &new.geometry)?;
                registry.check(&boundary, detector)
            }
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let alerts: Vec<serde_json::Value> = alerts
        .iter()
        .map(|a| {
            serde_json::json!({
                "existing_id": a.existing_parcel_id,
                "overlap_fraction": a.overlap_fraction,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "alerts": alerts })))
}

async fn register_parcel(
    State(state): State<AppState>,
    Json(payload): Json<RegisterParcelRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.decision == Decision::Fail {
        return Err(AppError::Unprocessable(format!(
            "parcel {} failed land-use validation and cannot be registered",
            payload.id
        )));
    }

    let engine = state.engine.clone();
    let registry = state.registry.clone();

    let (area_hectares, alerts) = tokio::task::spawn_blocking(move || {
        let boundary = ParcelBoundary::from_geojson(payload.id, &payload.geometry)?;
        let area = boundary.area_hectares();
        let alerts = registry.register(boundary, engine.overlap_detector())?;
        Ok::<_, ValidationError>((area, alerts))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    tracing::info!(
        "Registered parcel ({:.2} ha, {} overlap alerts)",
        area_hectares,
        alerts.len()
    );

    Ok(Json(serde_json::json!({
        "area_hectares": area_hectares,
        "alerts": alerts,
    })))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let alerts = state.registry.alerts(query.resolved)?;
    Ok(Json(serde_json::json!({
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = state.registry.resolve_alert(id)?;
    let body = serde_json::to_value(&record).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(body))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    InvalidGeometry(String),
    NotFound(String),
    Unprocessable(String),
    Unavailable(String),
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::InvalidGeometry(_) => AppError::InvalidGeometry(message),
            ValidationError::UnknownCrop(_) | ValidationError::AlertNotFound(_) => {
                AppError::NotFound(message)
            }
            ValidationError::DataUnavailable(_) => AppError::Unavailable(message),
            ValidationError::ModelUnavailable(_)
            | ValidationError::Catalog(_)
            | ValidationError::Config(_)
            | ValidationError::Registry(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::InvalidGeometry(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
