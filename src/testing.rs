//! Test doubles shared by the unit tests of several modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::audio::{encode_wav, MergedRecording, PcmFormat};
use crate::fetch::{FetchError, SegmentSource};
use crate::storage::{Storage, StorageError};

/// Encode `samples` as a WAV file with the given format.
pub fn wav_fixture(format: PcmFormat, samples: &[i32]) -> Vec<u8> {
    encode_wav(&MergedRecording {
        format,
        samples: samples.to_vec(),
    })
    .expect("fixture samples fit the bit depth")
    .to_vec()
}

/// Build a canonical 44-byte-header PCM WAV by hand around raw little-endian `data`.
pub fn riff_pcm(channel_count: u16, sample_rate: u32, bit_depth: u16, data: &[u8]) -> Vec<u8> {
    let block_align = channel_count * (bit_depth / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    let mut out = Vec::with_capacity(44 + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channel_count.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bit_depth.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory [`SegmentSource`] keyed by the last path segment of the URL.
#[derive(Default)]
pub struct FakeSource {
    replies: HashMap<String, (Reply, Duration)>,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, name: &str, body: Vec<u8>) -> Self {
        self.with_delay(name, body, 0)
    }

    pub fn with_delay(mut self, name: &str, body: Vec<u8>, delay_ms: u64) -> Self {
        self.replies
            .insert(name.to_string(), (Reply::Body(body), Duration::from_millis(delay_ms)));
        self
    }

    pub fn with_status(self, name: &str, status: u16) -> Self {
        self.with_delayed_status(name, status, 0)
    }

    pub fn with_delayed_status(mut self, name: &str, status: u16, delay_ms: u64) -> Self {
        self.replies
            .insert(name.to_string(), (Reply::Status(status), Duration::from_millis(delay_ms)));
        self
    }

    pub fn started_downloads(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed_downloads(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentSource for FakeSource {
    async fn download(&self, url: &Url) -> Result<Bytes, FetchError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();

        let result = match self.replies.get(name) {
            Some((reply, delay)) => {
                tokio::time::sleep(*delay).await;
                match reply {
                    Reply::Body(body) => Ok(Bytes::from(body.clone())),
                    Reply::Status(status) => Err(FetchError::Status {
                        url: url.to_string(),
                        status: *status,
                    }),
                }
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        };

        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// [`Storage`] that keeps every object in a map, optionally failing each call.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_with: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            objects: Mutex::default(),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn objects(&self) -> HashMap<String, Bytes> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn store(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
        if let Some(reason) = &self.fail_with {
            return Err(StorageError::Write {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        self.objects.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }
}
