//! Request extractors.

use std::collections::HashMap;

use agora_common::{AppError, AppResult};
use agora_core::MediaUpload;
use axum::extract::{FromRequest, Multipart, Request};

/// A buffered `multipart/form-data` body: text fields plus uploaded files.
///
/// File parts with no content are dropped, since browsers send an empty
/// part for a file input that was left blank.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, MediaUpload)>,
}

impl MultipartForm {
    /// A non-blank text field. The literal `null` counts as blank.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && *v != "null")
    }

    /// A text field that must be present, or a 400 with `message`.
    pub fn required(&self, name: &str, message: &str) -> AppResult<String> {
        self.text(name)
            .map(ToString::to_string)
            .ok_or_else(|| AppError::BadRequest(message.to_string()))
    }

    /// Take the first file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<MediaUpload> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    /// Take every file uploaded under `name`, in upload order.
    pub fn take_files(&mut self, name: &str) -> Vec<MediaUpload> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(ToString::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?
                    .to_vec();

                if !data.is_empty() {
                    form.files.push((
                        name,
                        MediaUpload {
                            file_name,
                            content_type,
                            data,
                        },
                    ));
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }
}
