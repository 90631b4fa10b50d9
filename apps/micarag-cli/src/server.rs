//! HTTP surface: `POST /query` and `GET /health`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use micarag_core::error::Error;
use micarag_core::types::QueryResult;
use micarag_pipeline::RagPipeline;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// A failed query rendered as `{"error": kind, "message": text}`.
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::Embedding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Generation(_) => StatusCode::BAD_GATEWAY,
            Error::Rerank(_) | Error::SchemaMismatch(_) | Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({"error": self.0.kind(), "message": self.0.to_string()});
        (status, Json(body)).into_response()
    }
}

pub fn router(pipeline: Arc<RagPipeline>) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .with_state(pipeline)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn query_handler(
    State(pipeline): State<Arc<RagPipeline>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let start = Instant::now();
    match pipeline.answer(&req.query).await {
        Ok(result) => {
            tracing::info!(sources = result.sources.len(), elapsed_ms = start.elapsed().as_millis() as u64, "query served");
            Ok(Json(result))
        }
        Err(e) => {
            tracing::warn!(kind = e.kind(), error = %e, "query failed");
            Err(ApiError(e))
        }
    }
}
