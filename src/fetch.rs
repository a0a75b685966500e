//! # Segment Fetching
//!
//! Downloads every recording segment of a request concurrently and decodes them.
//!
//! ## Concurrency Model:
//! - One spawned task per URL, no upper bound (a call rarely has more than a dozen answers)
//! - Each task owns its result; results are joined back in URL order, never arrival order
//! - A failing download does not cancel its siblings: every task runs to completion before
//!   any result is inspected
//!
//! ## Failure Semantics:
//! All or nothing. If any slot failed, the whole fetch fails with the error of the lowest
//! failing index and none of the decoded segments are used.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};

use crate::audio::{decode_segment, AudioSegment, DecodeError};
use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}, expected 200 OK")]
    Status { url: String, status: u16 },

    #[error("could not decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },

    #[error("download task for {url} did not finish: {reason}")]
    TaskAborted { url: String, reason: String },
}

/// Where segment bytes come from.
///
/// Production uses [`HttpSegmentSource`]; tests plug in an in-memory source with
/// artificial latencies.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Retrieve the full body behind `url`, failing on anything but `200 OK`.
    async fn download(&self, url: &Url) -> Result<Bytes, FetchError>;
}

/// Plain HTTP GET via a shared `reqwest` client.
///
/// The client carries the per-segment timeout, so a stalled provider fails that one slot
/// instead of holding the request open forever.
#[derive(Debug, Clone)]
pub struct HttpSegmentSource {
    client: reqwest::Client,
}

impl HttpSegmentSource {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SegmentSource for HttpSegmentSource {
    async fn download(&self, url: &Url) -> Result<Bytes, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.bytes().await.map_err(transport)
    }
}

/// Fans a request's URLs out over a [`SegmentSource`].
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn SegmentSource>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn SegmentSource>) -> Self {
        Self { source }
    }

    /// Download and decode every URL, returning segments in input order.
    pub async fn fetch_all(&self, urls: &[Url]) -> Result<Vec<AudioSegment>, FetchError> {
        let handles = urls.iter().cloned().map(|url| {
            let source = Arc::clone(&self.source);
            tokio::spawn(async move { fetch_one(source.as_ref(), &url).await })
        });

        // join_all yields in handle order, which is URL order
        let joined = join_all(handles).await;

        let slots: Vec<Result<AudioSegment, FetchError>> = urls
            .iter()
            .zip(joined)
            .map(|(url, joined)| {
                joined.unwrap_or_else(|err| {
                    Err(FetchError::TaskAborted {
                        url: url.to_string(),
                        reason: err.to_string(),
                    })
                })
            })
            .collect();

        for (index, slot) in slots.iter().enumerate() {
            if let Err(err) = slot {
                warn!(index, error = %err, "Segment fetch failed");
            }
        }

        slots.into_iter().collect()
    }
}

async fn fetch_one(source: &dyn SegmentSource, url: &Url) -> Result<AudioSegment, FetchError> {
    let body = source.download(url).await?;
    debug!(url = %url, bytes = body.len(), "Segment downloaded");

    decode_segment(url.as_str(), &body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmFormat;
    use crate::testing::{wav_fixture, FakeSource};
    use actix_web::{web, App, HttpResponse, HttpServer};

    const MONO_8K: PcmFormat = PcmFormat {
        channel_count: 1,
        sample_rate: 8000,
        bit_depth: 16,
    };

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://host/{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_order_follows_urls_not_completion() {
        // The first URL is the slowest, the last the fastest
        let source = FakeSource::new()
            .with_delay("a.wav", wav_fixture(MONO_8K, &[1, 1]), 120)
            .with_delay("b.wav", wav_fixture(MONO_8K, &[2, 2, 2]), 60)
            .with_delay("c.wav", wav_fixture(MONO_8K, &[3]), 0);
        let fetcher = Fetcher::new(Arc::new(source));

        let segments = fetcher
            .fetch_all(&[url("a.wav"), url("b.wav"), url("c.wav")])
            .await
            .unwrap();

        let samples: Vec<Vec<i32>> = segments.iter().map(|s| s.samples.clone()).collect();
        assert_eq!(samples, vec![vec![1, 1], vec![2, 2, 2], vec![3]]);
        assert_eq!(segments[0].source_url, "https://host/a.wav");
    }

    #[tokio::test]
    async fn test_one_failure_fails_all_but_every_download_runs() {
        let source = Arc::new(
            FakeSource::new()
                .with_body("a.wav", wav_fixture(MONO_8K, &[1]))
                .with_status("b.wav", 404)
                .with_delay("c.wav", wav_fixture(MONO_8K, &[3]), 80),
        );
        let fetcher = Fetcher::new(source.clone());

        let result = fetcher
            .fetch_all(&[url("a.wav"), url("b.wav"), url("c.wav")])
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
        assert_eq!(source.completed_downloads(), 3);
    }

    #[tokio::test]
    async fn test_first_error_by_index_wins() {
        // b fails late, c fails early; b is still the reported error
        let source = FakeSource::new()
            .with_body("a.wav", wav_fixture(MONO_8K, &[1]))
            .with_delayed_status("b.wav", 500, 100)
            .with_body("c.wav", b"garbage".to_vec());
        let fetcher = Fetcher::new(Arc::new(source));

        let result = fetcher
            .fetch_all(&[url("a.wav"), url("b.wav"), url("c.wav")])
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let source = FakeSource::new().with_body("a.wav", b"not audio".to_vec());
        let fetcher = Fetcher::new(Arc::new(source));

        let result = fetcher.fetch_all(&[url("a.wav")]).await;
        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }

    async fn serve_ok() -> HttpResponse {
        HttpResponse::Ok()
            .content_type("audio/wav")
            .body(wav_fixture(MONO_8K, &[7, 8, 9]))
    }

    async fn serve_missing() -> HttpResponse {
        HttpResponse::NotFound().finish()
    }

    async fn serve_created() -> HttpResponse {
        HttpResponse::Created().body(wav_fixture(MONO_8K, &[1]))
    }

    #[actix_web::test]
    async fn test_http_source_against_local_server() {
        let server = HttpServer::new(|| {
            App::new()
                .route("/ok.wav", web::get().to(serve_ok))
                .route("/missing.wav", web::get().to(serve_missing))
                .route("/created.wav", web::get().to(serve_created))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let running = server.run();
        let handle = running.handle();
        actix_web::rt::spawn(running);

        let source = HttpSegmentSource::new(&FetchConfig::default()).unwrap();
        let fetcher = Fetcher::new(Arc::new(source));
        let base = format!("http://{}", addr);

        let segments = fetcher
            .fetch_all(&[Url::parse(&format!("{}/ok.wav", base)).unwrap()])
            .await
            .unwrap();
        assert_eq!(segments[0].samples, vec![7, 8, 9]);

        let missing = fetcher
            .fetch_all(&[Url::parse(&format!("{}/missing.wav", base)).unwrap()])
            .await;
        assert!(matches!(missing, Err(FetchError::Status { status: 404, .. })));

        // Only an exact 200 counts as success
        let created = fetcher
            .fetch_all(&[Url::parse(&format!("{}/created.wav", base)).unwrap()])
            .await;
        assert!(matches!(created, Err(FetchError::Status { status: 201, .. })));

        handle.stop(false).await;
    }
}
