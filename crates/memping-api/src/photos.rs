//! On-disk storage for uploaded prompt photos.
//!
//! Files are content-addressed: the name is the SHA-256 hex digest of the
//! bytes plus an extension derived from the media type. No binary data lives
//! in the database; a photo prompt stores the `/photos/<file>` URL only.

use std::path::PathBuf;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tower_http::services::ServeDir;

use crate::error::ApiError;

/// URL prefix under which stored photos are served.
pub const PHOTO_ROUTE: &str = "/photos";

/// Default upload cap: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PhotoStorage {
  dir:       PathBuf,
  max_bytes: usize,
}

impl PhotoStorage {
  pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
    Self { dir: dir.into(), max_bytes }
  }

  pub fn max_bytes(&self) -> usize { self.max_bytes }

  /// Validate and persist an upload.
  pub async fn save(&self, data: Bytes, content_type: Option<&str>) -> Result<SavedPhoto, ApiError> {
    let extension = content_type.and_then(extension_for).ok_or_else(|| {
      ApiError::BadRequest(format!(
        "photo must be a jpeg, png, gif, webp or heic image, got {}",
        content_type.unwrap_or("no content type")
      ))
    })?;
    if data.is_empty() {
      return Err(ApiError::BadRequest("photo is empty".to_owned()));
    }
    if data.len() > self.max_bytes {
      return Err(ApiError::PayloadTooLarge { size: data.len(), limit: self.max_bytes });
    }

    let file_name = format!("{}.{extension}", hex::encode(Sha256::digest(&data)));
    let path = self.dir.join(&file_name);

    tokio::fs::create_dir_all(&self.dir).await?;
    let fresh = !tokio::fs::try_exists(&path).await?;
    if fresh {
      tokio::fs::write(&path, &data).await?;
      tracing::info!(file = %file_name, bytes = data.len(), "stored photo");
    }

    Ok(SavedPhoto { url: format!("{PHOTO_ROUTE}/{file_name}"), path, fresh })
  }

  /// Undo a [`save`](Self::save) whose prompt was never created. Files that
  /// already existed belong to other prompts and are left alone.
  pub async fn discard(&self, photo: &SavedPhoto) {
    if !photo.fresh {
      return;
    }
    if let Err(e) = tokio::fs::remove_file(&photo.path).await {
      tracing::warn!(path = %photo.path.display(), error = %e, "failed to remove orphaned photo");
    }
  }

  /// A static file service for the storage directory.
  pub fn service(&self) -> ServeDir { ServeDir::new(&self.dir) }
}

/// A stored upload.
#[derive(Debug, Clone)]
pub struct SavedPhoto {
  /// Site-relative URL, `/photos/<file>`.
  pub url: String,
  path:    PathBuf,
  /// Whether this save wrote the file.
  fresh:   bool,
}

/// Raster formats only. SVG can carry script and is served from our origin.
fn extension_for(media_type: &str) -> Option<&'static str> {
  match media_type {
    "image/jpeg" | "image/jpg" => Some("jpg"),
    "image/png" => Some("png"),
    "image/gif" => Some("gif"),
    "image/webp" => Some("webp"),
    "image/heic" => Some("heic"),
    _ => None,
  }
}
