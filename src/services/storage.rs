//! Disk-backed storage for book cover images.
//!
//! Stored names are generated (uuid + original extension) so client-supplied
//! file names never reach the filesystem.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Clone)]
pub struct ImageStore {
    upload_dir: PathBuf,
    max_upload_bytes: u64,
}

impl ImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Persist an uploaded image and return its stored file name.
    pub async fn save(
        &self,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> AppResult<String> {
        if !ALLOWED_TYPES.contains(&content_type) {
            return Err(AppError::Validation(
                "Only images are allowed (JPEG, PNG, GIF, WebP)".to_string(),
            ));
        }

        if data.len() as u64 > self.max_upload_bytes {
            return Err(AppError::Validation("File too large".to_string()));
        }

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        let name = format!("{}.{}", Uuid::new_v4(), ext);

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;
        tokio::fs::write(self.upload_dir.join(&name), data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store image: {}", e)))?;

        Ok(name)
    }

    /// Read a stored image. Returns the bytes and a content type guessed
    /// from the extension.
    pub async fn read(&self, name: &str) -> AppResult<(Vec<u8>, &'static str)> {
        let safe = Self::sanitize(name)?;

        let data = tokio::fs::read(self.upload_dir.join(safe))
            .await
            .map_err(|_| AppError::NotFound("Image not found".to_string()))?;

        Ok((data, content_type_for(safe)))
    }

    /// Delete a stored image. Missing files are not an error: the book row
    /// is authoritative, the file is just a cache of the upload.
    pub async fn delete(&self, name: &str) {
        if let Ok(safe) = Self::sanitize(name) {
            if let Err(e) = tokio::fs::remove_file(self.upload_dir.join(safe)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to delete image {}: {}", safe, e);
                }
            }
        }
    }

    /// Reject anything that could escape the upload directory.
    fn sanitize(name: &str) -> AppResult<&str> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(AppError::Validation("Invalid image name".to_string()));
        }
        Ok(name)
    }
}

fn content_type_for(name: &str) -> &'static str {
    match Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(ImageStore::sanitize("../etc/passwd").is_err());
        assert!(ImageStore::sanitize("a/b.png").is_err());
        assert!(ImageStore::sanitize("a\\b.png").is_err());
        assert!(ImageStore::sanitize("").is_err());
        assert!(ImageStore::sanitize("cover.png").is_ok());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a"), "application/octet-stream");
    }
}
