use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MediaConfig;

/// Distinguishes the two media collections a property carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const fn segment(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A single binary submitted through the multipart endpoint.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media upload failed: {0}")]
    Upload(String),
    #[error("media delete failed: {0}")]
    Delete(String),
    #[error("media store transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Gateway to the hosted media CDN.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload one binary and return its durable URL.
    async fn upload(&self, upload: MediaUpload) -> Result<String, MediaError>;

    /// Bulk delete by derived public id.
    async fn delete(&self, public_ids: &[String]) -> Result<(), MediaError>;
}

/// Extract the store's public id from a durable URL.
///
/// URLs follow the fixed `…/upload/v<version>/<folder…>/<name>.<ext>`
/// pattern; the public id is everything after the version segment with the
/// extension stripped. Returns `None` for URLs that do not match.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, tail) = url.split_once("/upload/")?;

    let mut segments = segments_after_version(tail);
    let last = segments.pop()?;
    let name = match last.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => last,
    };

    segments.push(name);
    Some(segments.join("/"))
}

fn segments_after_version(tail: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(first) = segments.first() {
        let is_version = first.len() > 1
            && first.starts_with('v')
            && first[1..].bytes().all(|b| b.is_ascii_digit());
        if is_version {
            segments.remove(0);
        }
    }
    segments
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Media store backed by the hosted CDN's HTTP API.
pub struct HttpMediaStore {
    http: reqwest::Client,
    config: MediaConfig,
}

impl HttpMediaStore {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn upload(&self, upload: MediaUpload) -> Result<String, MediaError> {
        let url = format!("{}/{}", self.config.upload_url, upload.kind.segment());
        let part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .part("file", part);

        let response = self.http.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(MediaError::Upload(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response.json().await?;
        Ok(body.secure_url)
    }

    async fn delete(&self, public_ids: &[String]) -> Result<(), MediaError> {
        if public_ids.is_empty() {
            return Ok(());
        }

        let payload = serde_json::json!({ "public_ids": public_ids });
        let response = self
            .http
            .post(&self.config.delete_url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Delete(format!(
                "provider returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// In-process media store for tests and `--in-memory` runs.
///
/// Hands out URLs in the same `/upload/v1/…` shape as the hosted CDN so
/// public-id extraction works against recorded uploads.
#[derive(Default)]
pub struct RecordingMediaStore {
    sequence: AtomicU64,
    uploads: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl RecordingMediaStore {
    pub fn failing_uploads() -> Self {
        let store = Self::default();
        store.fail_uploads.store(true, Ordering::Relaxed);
        store
    }

    pub fn failing_deletes() -> Self {
        let store = Self::default();
        store.fail_deletes.store(true, Ordering::Relaxed);
        store
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().expect("media mutex poisoned").clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("media mutex poisoned").clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn upload(&self, upload: MediaUpload) -> Result<String, MediaError> {
        if self.fail_uploads.load(Ordering::Relaxed) {
            return Err(MediaError::Upload("simulated upload failure".to_string()));
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let stem = upload
            .file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(upload.file_name.as_str());
        let url = format!(
            "https://media.khoroolol.test/{}/upload/v1/listings/{stem}-{seq}.bin",
            upload.kind.segment()
        );

        self.uploads
            .lock()
            .expect("media mutex poisoned")
            .push(url.clone());
        Ok(url)
    }

    async fn delete(&self, public_ids: &[String]) -> Result<(), MediaError> {
        if self.fail_deletes.load(Ordering::Relaxed) {
            return Err(MediaError::Delete("simulated delete failure".to_string()));
        }

        self.deleted
            .lock()
            .expect("media mutex poisoned")
            .extend(public_ids.iter().cloned());
        Ok(())
    }
}
