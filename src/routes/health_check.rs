use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::service::AuthService;
use crate::store::Store;

/// GET /health_check
///
/// Liveness only: 200 whenever the process serves requests.
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().finish()
}

/// GET /health
///
/// Reports whether the store answers. 503 when it does not.
pub async fn health<S: Store>(service: web::Data<AuthService<S>>) -> HttpResponse {
    match service.store_health().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "up",
            "db": { "status": "up" }
        })),
        Err(e) => {
            tracing::error!(error = %e, "Store health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "db": { "status": "down" }
            }))
        }
    }
}
