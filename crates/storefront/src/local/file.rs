//! JSON file implementation of [`LocalStore`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pharmacart_core::Cart;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use super::{LocalStore, StorageError};

/// Guest cart stored as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cart file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        self.path.with_file_name(
            self.path
                .file_name()
                .map_or_else(|| temp_name.clone(), |n| format!("{}{temp_name}", n.to_string_lossy())),
        )
    }
}

#[async_trait]
impl LocalStore for FileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn read_cart(&self) -> Result<Option<Cart>, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    #[instrument(skip(self, cart), fields(path = %self.path.display(), lines = cart.len()))]
    async fn write_cart(&self, cart: &Cart) -> Result<(), StorageError> {
        let data = serde_json::to_vec(cart)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        // Write to a uniquely named temp file, fsync, then rename so a crash
        // never leaves a half-written cart behind.
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove_cart(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
