//! Local directory backend.

use std::fs::DirBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use super::{Storage, StorageError};

/// Bytes written by the startup probe.
const PROBE: [u8; 4] = [1, 2, 3, 4];

/// Stores each recording as a file directly inside one directory.
#[derive(Debug, Clone)]
pub struct FolderStorage {
    root: PathBuf,
}

impl FolderStorage {
    /// Create the directory if needed and prove it is writable.
    ///
    /// ## Self-Test:
    /// 1. Create the directory (owner-only permissions on unix)
    /// 2. Check the path really is a directory
    /// 3. Create a temporary file inside it, write 4 bytes, flush
    /// 4. Delete the temporary file
    ///
    /// Any failing step fails construction.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        let target = root.display().to_string();
        let failed = |step: &'static str, err: std::io::Error| StorageError::SelfTest {
            target: target.clone(),
            step,
            reason: err.to_string(),
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        if let Err(err) = builder.create(&root) {
            // create() fails on an existing non-directory; report that precisely
            if root.exists() && !root.is_dir() {
                return Err(StorageError::NotADirectory(root));
            }
            return Err(failed("create the directory", err));
        }

        let metadata = std::fs::metadata(&root).map_err(|e| failed("inspect the directory", e))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotADirectory(root));
        }

        let mut probe = tempfile::Builder::new()
            .prefix(".vor-selftest-")
            .tempfile_in(&root)
            .map_err(|e| failed("create a file", e))?;
        probe.write_all(&PROBE).map_err(|e| failed("write a file", e))?;
        probe.as_file().sync_all().map_err(|e| failed("flush a file", e))?;
        probe.close().map_err(|e| failed("delete a file", e))?;

        info!(path = %root.display(), "Folder storage passed self-test");
        Ok(Self { root })
    }
}

#[async_trait]
impl Storage for FolderStorage {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn store(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
        let write_failed = |reason: String| StorageError::Write {
            name: name.to_string(),
            reason,
        };

        // Names must stay inside the directory
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(write_failed("invalid object name".to_string()));
        }

        tokio::fs::write(self.root.join(name), &data)
            .await
            .map_err(|e| write_failed(e.to_string()))
    }
}
