//! HTTP API поверх конвейера сегментации

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ClusteringConfig;
use crate::error::SegmentationError;
use crate::models::RfmScorer;
use crate::pipeline::SegmentationPipeline;
use crate::preprocessing::FeatureBuilder;
use crate::types::{
    CustomerFeatureVector, FeatureRequest, PipelineRequest, ScoredCustomer, SegmentationReport,
};

#[derive(Clone)]
pub struct AppState {
    pub default_clustering: Arc<ClusteringConfig>,
}

impl AppState {
    pub fn new(default_clustering: ClusteringConfig) -> Self {
        Self {
            default_clustering: Arc::new(default_clustering),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

#[derive(Debug)]
pub enum ApiError {
    Segmentation(SegmentationError),
    Internal(String),
}

impl From<SegmentationError> for ApiError {
    fn from(err: SegmentationError) -> Self {
        ApiError::Segmentation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Segmentation(SegmentationError::Clustering(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "clustering", e.to_string())
            }
            ApiError::Segmentation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.kind(), e.to_string()),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", message.clone())
            }
        };
        tracing::warn!("Request failed ({}): {}", kind, message);
        (
            status,
            Json(serde_json::json!({ "error": kind, "message": message })),
        )
            .into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/features", post(build_features))
        .route("/api/rfm", post(score_rfm))
        .route("/api/segment", post(segment))
        .layer(cors)
        .with_state(state)
}

/// Конвейер занимает CPU, поэтому выполняется вне рабочих потоков tokio
async fn run_blocking<T, F>(job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::Internal(format!("worker failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Customer Segmentation API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn build_features(
    Json(request): Json<FeatureRequest>,
) -> Result<Json<Vec<CustomerFeatureVector>>, ApiError> {
    tracing::info!("Features request: {} transactions", request.transactions.len());

    let features = run_blocking(move || {
        FeatureBuilder::build(&request.transactions, request.reference_date)
    })
    .await?;
    Ok(Json(features))
}

async fn score_rfm(
    Json(request): Json<FeatureRequest>,
) -> Result<Json<Vec<ScoredCustomer>>, ApiError> {
    tracing::info!("RFM request: {} transactions", request.transactions.len());

    let scored = run_blocking(move || {
        let features = FeatureBuilder::build(&request.transactions, request.reference_date)?;
        RfmScorer::score(&features)
    })
    .await?;
    Ok(Json(scored))
}

async fn segment(
    State(state): State<AppState>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<SegmentationReport>, ApiError> {
    let config = request
        .clustering
        .unwrap_or_else(|| state.default_clustering.as_ref().clone());
    tracing::info!(
        "Segment request: {} transactions, k = {}",
        request.transactions.len(),
        config.k
    );

    let transactions = request.transactions;
    let reference_date = request.reference_date;
    let report = run_blocking(move || {
        SegmentationPipeline::run(&transactions, reference_date, &config)
    })
    .await?;
    Ok(Json(report))
}
