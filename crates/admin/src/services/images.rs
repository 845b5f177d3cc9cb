//! Evidence image storage.
//!
//! Images are sniffed by their leading bytes, not by the client's content
//! type, and written under `{upload_dir}/returns/{order_id}/` with a random
//! name. The stored reference is the public path under `/uploads`.

use std::path::{Path, PathBuf};

use returndesk_core::{ImageRef, OrderId, ReturnError};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Public path prefix uploaded files are served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// An image received in a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Writes and removes uploaded images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Directory served under [`UPLOADS_PREFIX`].
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check an upload without writing it.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` if the image is empty, too large,
    /// or not JPEG, PNG, or WEBP.
    fn validate(&self, image: &UploadedImage) -> Result<ImageKind, ReturnError> {
        let name = image.file_name.as_deref().unwrap_or("image");
        if image.bytes.is_empty() {
            return Err(ReturnError::InvalidInput(format!("{name} is empty")));
        }
        if image.bytes.len() > self.max_bytes {
            return Err(ReturnError::InvalidInput(format!(
                "{name} is larger than {} bytes",
                self.max_bytes
            )));
        }
        ImageKind::sniff(&image.bytes).ok_or_else(|| {
            ReturnError::InvalidInput(format!("{name} must be a JPEG, PNG, or WEBP image"))
        })
    }

    /// Validate and write a batch of images for an order.
    ///
    /// Either every image is written or none is: on failure, files written so
    /// far are removed.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` for a rejected image and
    /// `AppError::Internal` if the filesystem write fails.
    #[instrument(skip(self, images), fields(order_id = %order_id, count = images.len()))]
    pub async fn save_all(
        &self,
        order_id: OrderId,
        images: &[UploadedImage],
    ) -> Result<Vec<ImageRef>, AppError> {
        let kinds = images
            .iter()
            .map(|image| self.validate(image))
            .collect::<Result<Vec<_>, _>>()?;

        if images.is_empty() {
            return Ok(Vec::new());
        }

        let dir = self.root.join("returns").join(order_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create upload directory: {e}")))?;

        let mut saved = Vec::with_capacity(images.len());
        for (image, kind) in images.iter().zip(kinds) {
            let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
            if let Err(e) = tokio::fs::write(dir.join(&file_name), &image.bytes).await {
                self.remove(&saved).await;
                return Err(AppError::Internal(format!("failed to write image: {e}")));
            }
            let reference = format!("{UPLOADS_PREFIX}/returns/{order_id}/{file_name}");
            saved.push(ImageRef::parse(&reference)?);
        }

        Ok(saved)
    }

    /// Best-effort removal of previously saved images.
    pub async fn remove(&self, images: &[ImageRef]) {
        for image in images {
            let Some(relative) = image
                .as_str()
                .strip_prefix(UPLOADS_PREFIX)
                .map(|p| p.trim_start_matches('/'))
            else {
                continue;
            };
            if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
                warn!(image = image.as_str(), error = %e, "Failed to remove uploaded image");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn upload(bytes: &[u8]) -> UploadedImage {
        UploadedImage {
            file_name: Some("photo".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_sniff() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"GIF89a"), None);
        assert_eq!(ImageKind::sniff(b""), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), 1024);

        let saved = store
            .save_all(OrderId::new(9), &[upload(PNG)])
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
        let reference = saved[0].as_str();
        assert!(reference.starts_with("/uploads/returns/9/"));
        assert!(reference.ends_with(".png"));

        let on_disk = dir
            .path()
            .join(reference.trim_start_matches("/uploads/"));
        assert!(on_disk.exists());

        store.remove(&saved).await;
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_rejects_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), 1024);

        let result = store
            .save_all(OrderId::new(9), &[upload(PNG), upload(b"GIF89a")])
            .await;
        assert!(matches!(
            result,
            Err(AppError::Returns(ReturnError::InvalidInput(_)))
        ));
        assert!(!dir.path().join("returns").exists());

        let too_big = vec![0xFF; 2048];
        assert!(store.save_all(OrderId::new(9), &[upload(&too_big)]).await.is_err());
    }
}
