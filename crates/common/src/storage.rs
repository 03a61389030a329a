//! Blob storage for post media and profile pictures.

use std::path::PathBuf;

use crate::{AppError, AppResult, config::StorageSettings};

/// Metadata of a stored blob.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (relative path).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a blob under `key`.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Delete a blob. Missing keys are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a blob exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Build a backend from the storage section of the config.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.base_path.clone(), settings.base_url.clone())
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(data));

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        tokio::fs::try_exists(self.base_path.join(key))
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

/// Generate a unique storage key for a file owned by `user_id`.
#[must_use]
pub fn generate_storage_key(user_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(char::is_alphanumeric))
        .map_or_else(|| "bin".to_string(), str::to_lowercase);

    format!(
        "{date_path}/{user_id}/{}.{extension}",
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("user123", "Photo.JPG");
        assert!(key.contains("/user123/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_generate_storage_key_rejects_odd_extensions() {
        assert!(generate_storage_key("u", "file").ends_with(".bin"));
        assert!(generate_storage_key("u", "clip.").ends_with(".bin"));
        assert!(generate_storage_key("u", "x.../etc").ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("agora-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/api/media/".to_string());

        let file = storage
            .upload("a/b.png", b"not really a png", "image/png")
            .await
            .unwrap();
        assert_eq!(file.url, "/api/media/a/b.png");
        assert_eq!(file.size, 16);
        assert!(storage.exists("a/b.png").await.unwrap());

        storage.delete("a/b.png").await.unwrap();
        assert!(!storage.exists("a/b.png").await.unwrap());

        // Deleting twice is fine.
        storage.delete("a/b.png").await.unwrap();

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
