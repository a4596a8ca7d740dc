//! Filesystem sink: the only place track units touch the disk.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait FileSink: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    async fn exists(&self, path: &Path) -> bool;

    /// Removes `path` and everything below it. A missing path is not an error.
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Local disk via `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

#[async_trait]
impl FileSink for LocalFs {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("create directory {}", path.display()))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tokio::fs::write(path, data)
            .await
            .with_context(|| format!("write {}", path.display()))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_dir_all(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}
