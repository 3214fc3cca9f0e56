//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::routes::AppState;
use crate::types::{AnswerRecord, VariableMapping};

// Request bodies

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculateRequest {
    /// Sketch as a base64 data URI (`data:image/png;base64,...`)
    pub image: String,
    /// Variables assigned by earlier answers
    #[serde(default)]
    #[schema(value_type = Object)]
    pub dict_of_vars: VariableMapping,
}

// Response types

#[derive(Debug, Serialize, ToSchema)]
pub struct CalculateResponse {
    /// Human readable outcome
    pub message: String,
    /// Answers in the order the model produced them
    pub data: Vec<AnswerRecord>,
    /// Always `success`
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

fn internal_error() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".into(),
        }),
    )
}

// Handlers

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Solve the expressions in a sketch
///
/// A reply the model formatted badly still returns 200, with a single
/// `Error parsing response` record as data. Every other failure, including a
/// malformed request body, is a 500 with a generic message.
#[utoipa::path(
    post,
    path = "/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Image processed", body = CalculateResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "calculate"
)]
pub async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(req) = payload.map_err(|e| {
        tracing::error!("Rejected request body: {}", e);
        internal_error()
    })?;

    let records = state
        .calculator
        .analyze_image(req.image, &req.dict_of_vars)
        .await
        .map_err(|e| {
            tracing::error!("Error processing image: {}", e);
            internal_error()
        })?;

    Ok(Json(CalculateResponse {
        message: "Image processed".into(),
        data: records,
        status: "success".into(),
    }))
}
