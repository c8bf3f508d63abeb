//! Liveness endpoint, mounted outside the route gate so probes never need a session.

use actix_web::{HttpResponse, Responder};

/// Returns a JSON response indicating the API is healthy.
///
/// # Example
/// ```json
/// { "status": "ok", "service": "storefront_admin" }
/// ```
#[tracing::instrument]
pub async fn health_check() -> impl Responder {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    }))
}
