//! S3 bucket backend.
//!
//! The bucket operations sit behind [`ObjectStore`] so the self-test logic can be exercised
//! against a fake that lacks delete permission, without any network access.

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use super::{Storage, StorageError};

/// Key of the object uploaded and removed by the startup self-test.
pub const SELF_TEST_KEY: &str = "__testobj";

/// The two bucket operations the backend needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> anyhow::Result<()>;
    async fn remove(&self, bucket: &str, key: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl ObjectStore for aws_sdk_s3::Client {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> anyhow::Result<()> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .content_type("audio/wav")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| format!("PutObject s3://{}/{}", bucket, key))?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> anyhow::Result<()> {
        self.delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| format!("DeleteObject s3://{}/{}", bucket, key))?;
        Ok(())
    }
}

/// Writes each recording as one object in a bucket, keyed by its name.
pub struct S3Storage<C = aws_sdk_s3::Client> {
    client: C,
    bucket: String,
}

impl S3Storage {
    /// Connect using credentials and region from the usual AWS environment chain.
    pub async fn from_env(bucket: &str) -> Result<Self, StorageError> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::open(aws_sdk_s3::Client::new(&config), bucket).await
    }
}

impl<C: ObjectStore> S3Storage<C> {
    /// Wrap `client` after uploading and deleting a dummy object.
    ///
    /// Missing credentials, an unknown bucket, or no delete permission all surface here
    /// rather than on the first recording.
    pub async fn open(client: C, bucket: &str) -> Result<Self, StorageError> {
        let target = format!("s3:{}", bucket);
        let failed = |step: &'static str, err: anyhow::Error| StorageError::SelfTest {
            target: target.clone(),
            step,
            reason: format!("{:#}", err),
        };

        client
            .upload(bucket, SELF_TEST_KEY, Bytes::from_static(b"test"))
            .await
            .map_err(|e| failed("upload an object", e))?;
        client
            .remove(bucket, SELF_TEST_KEY)
            .await
            .map_err(|e| failed("delete an object", e))?;

        info!(bucket, "S3 storage passed self-test");
        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl<C: ObjectStore> Storage for S3Storage<C> {
    fn kind(&self) -> &'static str {
        "s3"
    }

    async fn store(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
        self.client
            .upload(&self.bucket, name, data)
            .await
            .map_err(|e| StorageError::Write {
                name: name.to_string(),
                reason: format!("{:#}", e),
            })
    }
}
