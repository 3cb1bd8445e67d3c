use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use matinee_types::api::{Claims, MediaUploadResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// 5 MB cap on uploaded images
const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Request body limit for the router. Must clear [`MAX_IMAGE_SIZE`] plus
/// the base64 framing overhead of images sent inline in chat JSON.
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Disk-backed image store. Files land in `dir` under a random UUID
/// name and are served back under `public_base` by the static route.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    public_base: String,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.into(),
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Saves raw image bytes and returns the public URL. Only JPEG and
    /// PNG pass the magic-byte sniff; anything else is rejected.
    pub async fn save_image(&self, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            bail!("image is empty");
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            bail!("image exceeds {} byte limit", MAX_IMAGE_SIZE);
        }
        let ext = match sniff_image(bytes) {
            Some(ext) => ext,
            None => bail!("unsupported image format, expected JPEG or PNG"),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("failed to create media directory")?;

        let name = format!("{}.{ext}", Uuid::new_v4());
        let path = self.dir.join(&name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(format!("{}/{}", self.public_base.trim_end_matches('/'), name))
    }

    /// Decodes a base64 payload (with or without a `data:image/...;base64,`
    /// prefix, which is how browser canvases export) and stores it.
    pub async fn save_base64_image(&self, data: &str) -> Result<String> {
        let encoded = match data.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => data,
        };
        let bytes = BASE64
            .decode(encoded.trim())
            .context("invalid base64 image payload")?;
        self.save_image(&bytes).await
    }
}

fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("png")
    } else {
        None
    }
}

/// POST /api/media — raw image bytes in the body, returns { url }.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::bad_request("image exceeds the 5 MB limit"));
    }
    let url = state
        .media
        .save_image(&bytes)
        .await
        .map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
    Ok((StatusCode::CREATED, Json(MediaUploadResponse { url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(sniff_image(PNG_HEADER), Some("png"));
        assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpg"));
        assert_eq!(sniff_image(b"GIF89a"), None);
    }

    #[tokio::test]
    async fn stores_base64_with_data_url_prefix() {
        let dir = std::env::temp_dir().join(format!("matinee-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&dir, "http://localhost:4000/media");

        let payload = format!("data:image/png;base64,{}", BASE64.encode(PNG_HEADER));
        let url = store.save_base64_image(&payload).await.unwrap();
        assert!(url.starts_with("http://localhost:4000/media/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(dir.join(name)).await.unwrap();
        assert_eq!(on_disk, PNG_HEADER);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_non_image_bytes() {
        let dir = std::env::temp_dir().join(format!("matinee-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&dir, "http://localhost:4000/media");
        assert!(store.save_image(b"just text").await.is_err());
    }
}
