pub mod ingest;

pub use ingest::*;

use actix_web::web;

use crate::health;

/// Register every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(ingest::form_config())
        .route("/", web::post().to(ingest::ingest_recording))
        .route("/health", web::get().to(health::health_check));
}
