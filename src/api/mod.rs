//! HTTP API layer

mod routes;
mod handlers;

pub use handlers::{CalculateRequest, CalculateResponse, ErrorResponse, HealthResponse};
pub use routes::{cors_layer, create_router, ApiDoc, AppState};
