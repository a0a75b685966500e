use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "storage": {
            "kind": state.coordinator.storage_kind(),
        },
        "ingestion": {
            "requests": metrics.requests,
            "stored": metrics.stored,
            "bytes_stored": metrics.bytes_stored,
            "failed": metrics.failure_count(),
            "failure_rate": if metrics.requests > 0 {
                metrics.failure_count() as f64 / metrics.requests as f64
            } else {
                0.0
            },
            "failures": metrics.failures,
        }
    }))
}
