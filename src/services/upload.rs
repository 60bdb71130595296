//! Upload storage
//!
//! Validates files against the configured MIME allow-list and size ceiling,
//! then writes them under `upload.path` as `<unix-millis>-<random>.<ext>`.
//! Stored files are served back from `/uploads/<name>`.

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::config::UploadConfig;

/// URL prefix the upload directory is mounted at
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// Upper bound (exclusive) of the random filename component
const RANDOM_SPACE: u128 = 1_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File type {0} is not allowed")]
    UnsupportedType(String),

    #[error("File too large. Maximum size is {max} bytes")]
    TooLarge { max: u64 },

    #[error("File is empty")]
    Empty,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Metadata of a file written to the upload directory
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
}

/// Generate a collision-resistant name that keeps the original extension.
///
/// `photo.JPG` becomes e.g. `1718000000000-482913004.jpg`; a name without a
/// usable extension gets no suffix.
pub fn generate_filename(original: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().as_u128() % RANDOM_SPACE;

    match extension_of(original) {
        Some(ext) => format!("{}-{}.{}", millis, random, ext),
        None => format!("{}-{}", millis, random),
    }
}

/// Public URL of a stored file
pub fn url_for(filename: &str) -> String {
    format!("{}/{}", UPLOAD_URL_PREFIX, filename)
}

/// Lowercased extension of the final path component, if it is short and alphanumeric
fn extension_of(original: &str) -> Option<String> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 10 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Writes validated uploads to disk
pub struct UploadService {
    config: UploadConfig,
}

impl UploadService {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Check type and size without touching the disk
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), UploadError> {
        if !self.config.is_type_allowed(content_type) {
            return Err(UploadError::UnsupportedType(content_type.to_string()));
        }
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate and persist one file
    pub async fn store(
        &self,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredFile, UploadError> {
        self.validate(content_type, data.len() as u64)?;
        ensure_dir(&self.config.path).await?;

        let filename = generate_filename(original_name);
        let path = self.config.path.join(&filename);

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))?;

        tracing::debug!(file = %filename, size = data.len(), "Stored upload");

        Ok(StoredFile {
            url: url_for(&filename),
            filename,
            original_name: original_name.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    /// Remove a previously stored file by its public URL. Unknown URLs are ignored.
    pub async fn remove_by_url(&self, url: &str) -> Result<(), UploadError> {
        let Some(name) = url.strip_prefix(UPLOAD_URL_PREFIX).and_then(|s| s.strip_prefix('/')) else {
            return Ok(());
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Ok(());
        }

        match tokio::fs::remove_file(self.config.path.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to remove upload {}: {}", name, e).into()),
        }
    }
}

async fn ensure_dir(path: &Path) -> Result<(), UploadError> {
    if !path.exists() {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload directory: {}", e))?;
    }
    Ok(())
}
