//! Uploaded media: validation and storage.

use std::sync::Arc;

use agora_common::{AppError, AppResult, StorageBackend, generate_storage_key};
use agora_db::entities::post::{MediaKind, MediaRef};

/// Video containers accepted for posts.
pub const VIDEO_CONTENT_TYPES: [&str; 2] = ["video/mp4", "video/quicktime"];

/// A file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MediaUpload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Media storage for business logic.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
    max_video_bytes: usize,
}

impl MediaService {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, max_video_bytes: usize) -> Self {
        Self {
            storage,
            max_video_bytes,
        }
    }

    /// Reject anything that is not an image.
    pub fn check_image(&self, upload: &MediaUpload) -> AppResult<()> {
        if upload.content_type.starts_with("image/") {
            Ok(())
        } else {
            Err(AppError::BadRequest(
                "Only image files are supported".to_string(),
            ))
        }
    }

    /// Accept MP4 or QuickTime videos up to the configured size.
    pub fn check_video(&self, upload: &MediaUpload) -> AppResult<()> {
        if !VIDEO_CONTENT_TYPES.contains(&upload.content_type.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Invalid video format. Allowed formats: {}",
                VIDEO_CONTENT_TYPES.join(", ")
            )));
        }
        if upload.data.len() > self.max_video_bytes {
            return Err(AppError::BadRequest(format!(
                "Video size must be less than {}MB",
                self.max_video_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Write an already checked upload to storage.
    pub async fn store(
        &self,
        owner_id: &str,
        upload: &MediaUpload,
        kind: MediaKind,
    ) -> AppResult<MediaRef> {
        let key = generate_storage_key(owner_id, &upload.file_name);
        let stored = self
            .storage
            .upload(&key, &upload.data, &upload.content_type)
            .await?;

        tracing::debug!(key = %stored.key, size = stored.size, ?kind, "Stored media");

        Ok(MediaRef {
            id: stored.key,
            kind,
            url: stored.url,
            content_type: stored.content_type,
        })
    }

    /// Check and store a batch: an optional video first, then images.
    ///
    /// Nothing is written unless every file passes its check. If a write
    /// fails, blobs stored so far are removed again.
    pub async fn store_all(
        &self,
        owner_id: &str,
        video: Option<&MediaUpload>,
        images: &[MediaUpload],
    ) -> AppResult<Vec<MediaRef>> {
        if let Some(video) = video {
            self.check_video(video)?;
        }
        for image in images {
            self.check_image(image)?;
        }

        let uploads = video
            .map(|v| (v, MediaKind::Video))
            .into_iter()
            .chain(images.iter().map(|i| (i, MediaKind::Image)));

        let mut stored = Vec::new();
        for (upload, kind) in uploads {
            match self.store(owner_id, upload, kind).await {
                Ok(media) => stored.push(media),
                Err(e) => {
                    self.discard(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Delete blobs, logging failures instead of returning them.
    pub async fn discard(&self, media: &[MediaRef]) {
        for m in media {
            if let Err(e) = self.storage.delete(&m.id).await {
                tracing::warn!(error = %e, key = %m.id, "Failed to delete media");
            }
        }
    }
}

/// In-memory storage for service tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<std::sync::Mutex<std::collections::BTreeMap<String, Vec<u8>>>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .lock()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl StorageBackend for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<agora_common::UploadedFile> {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(key.to_string(), data.to_vec());
        }
        Ok(agora_common::UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5: String::new(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.remove(key);
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("/api/media/{key}")
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.blobs.lock().is_ok_and(|b| b.contains_key(key)))
    }
}

#[cfg(test)]
pub fn upload(file_name: &str, content_type: &str, len: usize) -> MediaUpload {
    MediaUpload {
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        data: vec![0; len],
    }
}
