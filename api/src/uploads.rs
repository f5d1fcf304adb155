use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_DOCUMENTS: usize = 10;
pub const MAX_PROFILE_IMAGES: usize = 1;

// Extension and declared media type must both be on this list.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}")]
    InvalidType(String),
    #[error("File {name} exceeds the {limit} byte limit")]
    TooLarge { name: String, limit: usize },
    #[error("Too many files for field {0}")]
    TooMany(&'static str),
}

/// A file part read from a multipart body, not yet on disk.
#[derive(Debug)]
pub struct IncomingFile {
    pub original_name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub original_name: String,
    pub media_type: String,
    pub stored_name: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Upper bound for a whole registration body: every file slot full,
    /// plus room for the text fields.
    pub fn request_limit(&self) -> usize {
        self.max_bytes
            .saturating_mul(MAX_DOCUMENTS + MAX_PROFILE_IMAGES)
            .saturating_add(1024 * 1024)
    }

    /// Returns the normalised extension of an acceptable file.
    pub fn check(&self, file: &IncomingFile) -> Result<&'static str, UploadError> {
        if file.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                name: file.original_name.clone(),
                limit: self.max_bytes,
            });
        }

        let extension = Path::new(&file.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let media_type = file
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        ALLOWED_TYPES
            .iter()
            .find(|(ext, mime)| *ext == extension && *mime == media_type)
            .map(|(ext, _)| *ext)
            .ok_or_else(|| UploadError::InvalidType(file.original_name.clone()))
    }

    /// Writes an already checked file under a fresh `<field>-<uuid>.<ext>` name.
    pub async fn save(
        &self,
        field: &str,
        extension: &str,
        file: IncomingFile,
    ) -> std::io::Result<StoredFile> {
        let stored_name = format!("{field}-{}.{extension}", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&stored_name), &file.bytes).await?;
        tracing::debug!("Stored upload {} as {}", file.original_name, stored_name);

        Ok(StoredFile {
            original_name: file.original_name,
            media_type: file.media_type,
            stored_name,
        })
    }

    /// Resolves a stored name to its path. Anything that is not a bare file
    /// name is refused.
    pub fn path_of(&self, stored_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(stored_name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(name)), None) => Some(self.dir.join(name)),
            _ => None,
        }
    }

    /// Best-effort delete; failures are logged, never returned.
    pub async fn remove(&self, stored_name: &str) {
        let Some(path) = self.path_of(stored_name) else {
            tracing::warn!("Refusing to remove suspicious upload path {}", stored_name);
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
        }
    }

    pub async fn remove_all(&self, stored_names: &[&str]) {
        for name in stored_names {
            self.remove(name).await;
        }
    }
}
