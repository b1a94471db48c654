//! File storage for uploads.
//!
//! Keys are namespaced by what they hold (`avatars/`, `resumes/`, `files/`)
//! and resolved against a local base directory.

use std::{fmt, path::PathBuf, sync::Arc};

use crate::{AppError, AppResult};

/// Shared storage handle passed to services.
pub type StorageService = Arc<dyn StorageBackend>;

/// Top-level folder a stored file lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageNamespace {
    /// Profile pictures.
    Avatars,
    /// Uploaded CVs.
    Resumes,
    /// Chat message attachments.
    Files,
}

impl StorageNamespace {
    /// Directory name of the namespace.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::Resumes => "resumes",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for StorageNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file received from a client, before it is stored.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Original file name as sent by the client.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl FileUpload {
    /// Size of the file in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased extension of the original file name, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.file_name).map(str::to_ascii_lowercase)
    }
}

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the storage root).
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
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Read a stored file back.
    async fn read(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Delete a file. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
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

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
            return Err(AppError::Storage(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(key))
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
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(data));

        tracing::debug!(key = %key, size = data.len(), "Stored file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn read(&self, key: &str) -> AppResult<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(format!("File {key}")),
            _ => AppError::Storage(format!("Failed to read file: {e}")),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }
}

fn file_extension(name: &str) -> Option<&str> {
    name.rfind('.')
        .filter(|&pos| pos > 0 && pos < name.len() - 1)
        .map(|pos| &name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Generate a unique storage key for a file.
///
/// Layout: `{namespace}/{owner}/{timestamp}_{uuid}.{ext}`.
#[must_use]
pub fn generate_storage_key(
    namespace: StorageNamespace,
    owner_id: &str,
    original_name: &str,
) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let extension = file_extension(original_name)
        .map_or_else(|| "bin".to_string(), str::to_ascii_lowercase);

    format!(
        "{namespace}/{owner_id}/{timestamp}_{}.{extension}",
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalStorage, PathBuf) {
        let dir = std::env::temp_dir().join(format!("mentorconnect-{}", uuid::Uuid::new_v4()));
        (LocalStorage::new(dir.clone(), "/media/".to_string()), dir)
    }

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key(StorageNamespace::Avatars, "user123", "Photo.JPG");
        assert!(key.starts_with("avatars/user123/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key(StorageNamespace::Files, "user123", "file");
        assert!(key.starts_with("files/"));
        assert!(key.ends_with(".bin"));

        let key = generate_storage_key(StorageNamespace::Files, "user123", "evil.p/hp");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_file_upload_extension() {
        let upload = FileUpload {
            file_name: "CV.Docx".to_string(),
            content_type: "application/octet-stream".to_string(),
            data: vec![1, 2, 3],
        };
        assert_eq!(upload.extension().as_deref(), Some("docx"));
        assert_eq!(upload.size(), 3);
    }

    #[tokio::test]
    async fn test_local_storage_lifecycle() {
        let (storage, dir) = temp_storage();
        let key = "files/u1/a.txt";

        let uploaded = storage.upload(key, b"hello", "text/plain").await.unwrap();
        assert_eq!(uploaded.url, "/media/files/u1/a.txt");
        assert_eq!(uploaded.size, 5);
        assert!(storage.exists(key).await.unwrap());
        assert_eq!(storage.read(key).await.unwrap(), b"hello");

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());
        // Deleting twice is fine
        storage.delete(key).await.unwrap();

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (storage, _dir) = temp_storage();
        let err = storage.read("files/none").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (storage, _dir) = temp_storage();
        let err = storage.upload("../etc/passwd", b"x", "text/plain").await;
        assert!(matches!(err, Err(AppError::Storage(_))));
    }
}
