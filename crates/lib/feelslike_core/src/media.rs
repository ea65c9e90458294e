//! Uploaded media (avatars, post images).
//!
//! Files live in one directory on disk and are referenced by a relative path
//! of the form `uploads/<random>.<ext>`, which is also the URL path the API
//! serves them under.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Public prefix of every stored media path.
pub const UPLOADS_PREFIX: &str = "uploads";

/// Extension used when none can be derived.
const FALLBACK_EXTENSION: &str = "jpg";

const NAME_LEN: usize = 16;

/// Media storage errors.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),
}

/// Stores files and hands back a relative path to reference them by.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store uploaded bytes. `original_name` only contributes its extension.
    async fn store_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String, MediaError>;

    /// Download an image and store it.
    async fn store_remote(&self, url: &str) -> Result<String, MediaError>;

    /// Delete a stored file by the path returned from a `store_*` call.
    async fn remove(&self, path: &str) -> Result<(), MediaError>;
}

/// [`MediaStore`] writing into a local directory.
#[derive(Debug, Clone)]
pub struct DiskMediaStore {
    root: PathBuf,
    client: reqwest::Client,
}

impl DiskMediaStore {
    pub fn new(root: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            root: root.into(),
            client,
        }
    }

    /// Directory files are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write(&self, extension: &str, bytes: &[u8]) -> Result<String, MediaError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}.{extension}", random_name());
        tokio::fs::write(self.root.join(&name), bytes).await?;
        debug!(file = %name, size = bytes.len(), "stored media");
        Ok(format!("{UPLOADS_PREFIX}/{name}"))
    }

    /// Map a stored relative path back to a file under `root`, refusing
    /// anything that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, MediaError> {
        let name = path
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| MediaError::InvalidPath(path.to_string()))?;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Ok(self.root.join(file)),
            _ => Err(MediaError::InvalidPath(path.to_string())),
        }
    }
}

#[async_trait]
impl MediaStore for DiskMediaStore {
    async fn store_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let extension = sanitize_extension(original_name.rsplit_once('.').map(|(_, ext)| ext));
        self.write(&extension, bytes).await
    }

    async fn store_remote(&self, url: &str) -> Result<String, MediaError> {
        let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MediaError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        let extension = sanitize_extension(
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(|last| last.rsplit_once('.'))
                .map(|(_, ext)| ext),
        );
        let bytes = self
            .client
            .get(parsed)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        self.write(&extension, &bytes).await
    }

    async fn remove(&self, path: &str) -> Result<(), MediaError> {
        let file = self.resolve(path)?;
        tokio::fs::remove_file(file).await?;
        Ok(())
    }
}

fn random_name() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Short alphanumeric extensions pass through (lowercased); anything else
/// becomes the fallback.
fn sanitize_extension(ext: Option<&str>) -> String {
    match ext {
        Some(ext)
            if !ext.is_empty()
                && ext.len() <= 8
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}
