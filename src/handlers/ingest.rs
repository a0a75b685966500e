use crate::{error::IngestError, state::AppState};
use actix_web::{error::InternalError, web, HttpResponse};
use serde::Deserialize;
use tracing::warn;

/// Fields posted by the telephony provider's callback.
///
/// Missing fields deserialize to empty strings so they are rejected by the pipeline's own
/// validation with a plain 400, like any other bad value.
#[derive(Debug, Deserialize)]
pub struct IngestForm {
    #[serde(default)]
    pub phone: String,
    /// JSON array of segment URLs, as a string
    #[serde(default)]
    pub urls: String,
}

pub async fn ingest_recording(
    state: web::Data<AppState>,
    form: web::Form<IngestForm>,
) -> Result<HttpResponse, IngestError> {
    let form = form.into_inner();
    let outcome = state.coordinator.process(&form.phone, &form.urls).await;
    state.record_outcome(&outcome);

    outcome.map(|_| HttpResponse::Ok().finish())
}

/// Undecodable form bodies get the same bodiless 400 as invalid field values.
pub fn form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, _req| {
        warn!(error = %err, "Could not decode ingestion form");
        InternalError::from_response(err, HttpResponse::BadRequest().finish()).into()
    })
}
