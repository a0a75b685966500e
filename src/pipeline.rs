//! # Ingestion Pipeline
//!
//! Turns one provider callback into one stored recording:
//!
//! ```text
//! validate -> fetch (parallel) -> merge -> encode -> name -> store
//! ```
//!
//! Each stage either hands a complete result to the next or stops the request. Storage is
//! attempted exactly once, and only after the whole recording exists in memory, so a failed
//! request never leaves anything behind.

use std::sync::Arc;
use std::time::SystemTime;

use reqwest::Url;
use serde::Serialize;
use tracing::{info, warn};

use crate::anonymize::{derive_name, Salt};
use crate::audio::{encode_wav, merge_segments, PcmFormat};
use crate::error::{IngestError, IngestResult};
use crate::fetch::{Fetcher, SegmentSource};
use crate::storage::Storage;

/// A validated ingestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub subject: String,
    pub urls: Vec<Url>,
}

impl IngestRequest {
    /// Validate the raw form fields.
    ///
    /// ## Rules:
    /// - `phone` must contain something other than whitespace; it is kept verbatim, since
    ///   an unencoded `+` arrives as a leading space and is part of the hashed value
    /// - `urls` must be a JSON array of strings with at least one element
    /// - every element must be an absolute URL
    pub fn parse(phone: &str, urls: &str) -> IngestResult<Self> {
        if phone.trim().is_empty() {
            return Err(IngestError::BadRequest("phone is missing".to_string()));
        }

        let raw: Vec<String> = serde_json::from_str(urls)
            .map_err(|e| IngestError::BadRequest(format!("urls is not a JSON string array: {}", e)))?;
        if raw.is_empty() {
            return Err(IngestError::BadRequest("urls is empty".to_string()));
        }

        let urls = raw
            .iter()
            .enumerate()
            .map(|(index, url)| {
                Url::parse(url).map_err(|e| {
                    IngestError::BadRequest(format!("url {} is not an absolute URL: {}", index, e))
                })
            })
            .collect::<IngestResult<Vec<_>>>()?;

        Ok(Self {
            subject: phone.to_string(),
            urls,
        })
    }
}

/// What was stored for a successful request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecording {
    pub name: String,
    pub format: PcmFormat,
    pub sample_count: usize,
    pub byte_len: usize,
}

/// Runs requests through the pipeline.
///
/// Holds the process-wide salt and the storage backend; both are read-only, so one
/// coordinator serves every concurrent request.
pub struct Coordinator {
    fetcher: Fetcher,
    storage: Arc<dyn Storage>,
    salt: Salt,
}

impl Coordinator {
    pub fn new(source: Arc<dyn SegmentSource>, storage: Arc<dyn Storage>, salt: Salt) -> Self {
        Self {
            fetcher: Fetcher::new(source),
            storage,
            salt,
        }
    }

    pub fn storage_kind(&self) -> &'static str {
        self.storage.kind()
    }

    /// Validate the raw form fields and run the pipeline.
    pub async fn process(&self, phone: &str, urls: &str) -> IngestResult<StoredRecording> {
        let request = IngestRequest::parse(phone, urls).map_err(|err| {
            warn!(kind = err.kind(), error = %err, "Rejected ingestion request");
            err
        })?;

        self.ingest(&request).await.map_err(|err| {
            warn!(kind = err.kind(), error = %err, "Ingestion failed");
            err
        })
    }

    /// Run a validated request through fetch, merge, encode, naming and storage.
    pub async fn ingest(&self, request: &IngestRequest) -> IngestResult<StoredRecording> {
        let segments = self.fetcher.fetch_all(&request.urls).await?;
        let recording = merge_segments(segments)?;
        let wav = encode_wav(&recording)?;

        let anonymized = derive_name(&self.salt, &request.subject, SystemTime::now());
        let name = anonymized.to_string();
        let byte_len = wav.len();
        self.storage.store(&name, wav).await?;

        info!(
            name = %name,
            digest = anonymized.digest(),
            segments = request.urls.len(),
            frames = recording.frame_count(),
            format = %recording.format,
            storage = self.storage.kind(),
            "Recording stored"
        );

        Ok(StoredRecording {
            name,
            format: recording.format,
            sample_count: recording.samples.len(),
            byte_len,
        })
    }
}
