//! # Recording Storage
//!
//! Persistence backends for finished recordings. The server talks to exactly one backend,
//! chosen once at startup from a specifier string:
//!
//! - `file:<path>` - a local directory ([`FolderStorage`])
//! - `s3:<bucket>` - an S3 bucket using the standard AWS credential chain ([`S3Storage`])
//!
//! ## Startup Self-Test:
//! Both backends prove they can write *and* delete before the server accepts traffic.
//! A misconfigured destination therefore stops the process at boot instead of failing the
//! first real recording.
//!
//! ## Concurrency:
//! Backends hold only immutable configuration plus a client that is itself safe to share,
//! so `store` may run from many requests at once.

pub mod folder;  // Local directory backend
pub mod s3;      // S3 bucket backend

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use folder::FolderStorage;
pub use s3::S3Storage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("self-test of {target} failed while trying to {step}: {reason}")]
    SelfTest {
        target: String,
        step: &'static str,
        reason: String,
    },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("could not store {name}: {reason}")]
    Write { name: String, reason: String },
}

/// The single capability every backend offers.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn kind(&self) -> &'static str;

    /// Persist `data` under `name`, replacing any existing object with that name.
    async fn store(&self, name: &str, data: Bytes) -> Result<(), StorageError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageSpecError {
    #[error("storage target is empty; use file:<path> or s3:<bucket>")]
    Empty,

    #[error("unknown storage target '{0}'; use file:<path> or s3:<bucket>")]
    UnknownScheme(String),

    #[error("storage target '{0}' is missing a path or bucket name")]
    MissingLocation(String),
}

/// Parsed form of the `storage.target` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSpec {
    Folder(PathBuf),
    S3 { bucket: String },
}

impl FromStr for StorageSpec {
    type Err = StorageSpecError;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let target = target.trim();
        if target.is_empty() {
            return Err(StorageSpecError::Empty);
        }

        let (scheme, location) = target
            .split_once(':')
            .ok_or_else(|| StorageSpecError::UnknownScheme(target.to_string()))?;
        if location.is_empty() {
            return Err(StorageSpecError::MissingLocation(target.to_string()));
        }

        match scheme {
            "file" => Ok(StorageSpec::Folder(PathBuf::from(location))),
            "s3" => Ok(StorageSpec::S3 {
                bucket: location.to_string(),
            }),
            _ => Err(StorageSpecError::UnknownScheme(target.to_string())),
        }
    }
}

/// Build the configured backend, running its self-test.
pub async fn open_storage(spec: &StorageSpec) -> Result<Arc<dyn Storage>, StorageError> {
    match spec {
        StorageSpec::Folder(path) => Ok(Arc::new(FolderStorage::open(path)?)),
        StorageSpec::S3 { bucket } => Ok(Arc::new(S3Storage::from_env(bucket).await?)),
    }
}
