//! Upload helpers around the configured [`MediaStore`].

use feelslike_core::media::MediaStore;
use tracing::warn;

use crate::error::AppResult;
use crate::extract::FormUpload;

/// Persist an uploaded form file and return its relative path.
pub async fn store_form_upload(media: &dyn MediaStore, upload: &FormUpload) -> AppResult<String> {
    Ok(media.store_upload(&upload.file_name, &upload.bytes).await?)
}

/// Best-effort removal of a stored file. Failures are logged, never returned.
pub async fn discard(media: &dyn MediaStore, path: &str) {
    if path.is_empty() {
        return;
    }
    if let Err(e) = media.remove(path).await {
        warn!(path, error = %e, "failed to remove media file");
    }
}
