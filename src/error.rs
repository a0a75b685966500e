//! # Error Handling
//!
//! This module defines the ways an ingestion request can fail and how each failure is turned
//! into an HTTP response for the telephony provider.
//!
//! ## Error Categories:
//! | Variant | Cause | Status |
//! |---|---|---|
//! | `BadRequest` | missing phone, malformed or empty URL list | 400 |
//! | `UpstreamFetch` | a segment could not be downloaded or decoded | 500 |
//! | `FormatMismatch` | segments disagree on channels, rate or bit depth | 500 |
//! | `Encoding` | the merged recording could not be serialized | 500 |
//! | `Storage` | the backend rejected the write | 500 |
//!
//! ## Response Format:
//! The provider only looks at the status code, so every response has an empty body. The
//! detailed reason goes to the log instead.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::audio::{EncodeError, MergeError};
use crate::fetch::FetchError;
use crate::storage::StorageError;

/// Everything that can make an ingestion request fail.
///
/// Each variant wraps the component error that caused it, so the full chain is available
/// to the log while the client only sees the status code.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request itself is unusable; nothing was fetched or stored
    #[error("bad request: {0}")]
    BadRequest(String),

    /// At least one segment failed; the others were still awaited
    #[error("fetching segments failed: {0}")]
    UpstreamFetch(#[from] FetchError),

    /// Segments cannot be merged without resampling or remixing
    #[error("segment formats differ: {0}")]
    FormatMismatch(#[from] MergeError),

    /// Internal fault while building the WAV file
    #[error("encoding the recording failed: {0}")]
    Encoding(#[from] EncodeError),

    /// The backend refused the write
    #[error("storing the recording failed: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Stable machine-readable name, used as a log field and health counter key.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::BadRequest(_) => "bad_request",
            IngestError::UpstreamFetch(_) => "upstream_fetch",
            IngestError::FormatMismatch(_) => "format_mismatch",
            IngestError::Encoding(_) => "encoding",
            IngestError::Storage(_) => "storage",
        }
    }
}

/// Maps each failure to its status code.
///
/// ## HTTP Status Code Mapping:
/// - BadRequest → 400
/// - everything else → 500
impl ResponseError for IngestError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).finish()
    }
}

/// Shorthand for results of the ingestion pipeline.
pub type IngestResult<T> = Result<T, IngestError>;
