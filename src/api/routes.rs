//! API route definitions

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{self, CalculateRequest, CalculateResponse, ErrorResponse, HealthResponse};
use crate::calculator::Calculator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::AnswerRecord;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Drawsy API",
        version = "0.1.0",
        description = "Solves handwritten math sketches with a multimodal model"
    ),
    tags(
        (name = "calculate", description = "Sketch analysis"),
        (name = "health", description = "Health checks")
    ),
    paths(handlers::health, handlers::calculate),
    components(schemas(
        AnswerRecord,
        CalculateRequest,
        CalculateResponse,
        HealthResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub calculator: Arc<Calculator>,
}

impl AppState {
    pub fn new(calculator: Calculator) -> Self {
        Self {
            calculator: Arc::new(calculator),
        }
    }
}

/// CORS for the configured browser origins: GET and POST, with credentials
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| Error::Config(format!("Invalid allowed origin: {origin}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Create the API router
pub fn create_router(state: AppState, config: &Config) -> Result<Router> {
    let cors = cors_layer(&config.allowed_origins)?;
    let openapi = ApiDoc::openapi();

    Ok(Router::new()
        .route("/calculate", post(handlers::calculate))

        // Health
        .route("/health", get(handlers::health))

        // OpenAPI spec and Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi))

        .layer(DefaultBodyLimit::max(config.body_limit_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
