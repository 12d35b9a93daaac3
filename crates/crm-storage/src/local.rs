use crate::traits::{AttachmentStore, StorageError, StorageResult};
use async_trait::async_trait;
use crm_core::models::Attachment;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Local filesystem attachment store
#[derive(Clone, Debug)]
pub struct LocalAttachmentStore {
    base_path: PathBuf,
}

impl LocalAttachmentStore {
    /// Open the store, creating `base_path` (and its parents) if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create attachments directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalAttachmentStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a hashed filename to its path, rejecting anything that is not a
    /// single plain file name.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a plain file name",
                key
            )));
        }

        let path = self.base_path.join(key);
        if path.parent() != Some(self.base_path.as_path()) {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside attachments directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Write `content` to a temporary file in the attachments directory and
    /// move it into place, so `path` never holds a partial file. Without
    /// `replace` an existing file wins and `Ok(false)` is returned.
    async fn write_atomically(
        &self,
        path: PathBuf,
        content: Vec<u8>,
        replace: bool,
    ) -> StorageResult<bool> {
        let base_path = self.base_path.clone();

        tokio::task::spawn_blocking(move || -> StorageResult<bool> {
            let write_failed = |e: std::io::Error| {
                StorageError::WriteFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                ))
            };

            let mut temp = NamedTempFile::new_in(&base_path).map_err(write_failed)?;
            temp.write_all(&content).map_err(write_failed)?;
            temp.as_file().sync_all().map_err(write_failed)?;

            let persisted = if replace {
                temp.persist(&path)
            } else {
                temp.persist_noclobber(&path)
            };
            match persisted {
                Ok(_) => Ok(true),
                Err(e) if !replace && e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(write_failed(e.error)),
            }
        })
        .await
        .map_err(|e| StorageError::WriteFailed(format!("Write task failed: {}", e)))?
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn persist(&self, attachment: &Attachment) -> StorageResult<bool> {
        let path = self.key_to_path(&attachment.hashed_filename)?;
        if attachment.hashed_filepath != path {
            tracing::warn!(
                expected = %attachment.hashed_filepath.display(),
                actual = %path.display(),
                "Attachment path was computed for a different attachments directory"
            );
        }

        let start = std::time::Instant::now();
        let expected_len = attachment.binary_content.len() as u64;

        let replace = match fs::metadata(&path).await {
            Ok(meta) if meta.len() == expected_len => {
                tracing::debug!(
                    key = %attachment.hashed_filename,
                    original_filename = %attachment.original_filename,
                    "Attachment already stored"
                );
                return Ok(false);
            }
            Ok(meta) => {
                tracing::warn!(
                    key = %attachment.hashed_filename,
                    stored_bytes = meta.len(),
                    expected_bytes = expected_len,
                    "Stored attachment is incomplete, replacing it"
                );
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to stat file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let written = self
            .write_atomically(path.clone(), attachment.binary_content.clone(), replace)
            .await?;
        if !written {
            tracing::debug!(
                key = %attachment.hashed_filename,
                "Attachment stored concurrently"
            );
            return Ok(false);
        }

        tracing::info!(
            path = %path.display(),
            key = %attachment.hashed_filename,
            size_bytes = attachment.binary_content.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Attachment stored"
        );

        Ok(true)
    }

    async fn read(&self, hashed_filename: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(hashed_filename)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(hashed_filename.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, hashed_filename: &str) -> StorageResult<bool> {
        let path = self.key_to_path(hashed_filename)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn attachment(dir: &Path, name: &str, bytes: &[u8]) -> Attachment {
        Attachment {
            hashed_filename: name.to_string(),
            hashed_filepath: dir.join(name),
            hashed_file_url: format!("/static/uploads/attachments/{}", name),
            original_filename: "report.pdf".to_string(),
            binary_content: bytes.to_vec(),
            content_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_creates_nested_directory() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("static/uploads/attachments");

        let store = LocalAttachmentStore::new(&base).await.unwrap();

        assert!(base.is_dir());
        assert_eq!(store.base_path(), base.as_path());
    }

    #[tokio::test]
    async fn test_persist_then_read() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path()).await.unwrap();
        let att = attachment(temp.path(), "abc123.pdf", b"%PDF-1.4 body");

        assert!(store.persist(&att).await.unwrap());
        assert!(store.exists("abc123.pdf").await.unwrap());
        assert_eq!(store.read("abc123.pdf").await.unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn test_persist_is_write_once() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path()).await.unwrap();
        let first = attachment(temp.path(), "abc123.pdf", b"original");
        let second = attachment(temp.path(), "abc123.pdf", b"replaced");

        assert!(store.persist(&first).await.unwrap());
        assert!(!store.persist(&second).await.unwrap());
        assert_eq!(store.read("abc123.pdf").await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_truncated_file_is_rewritten() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path()).await.unwrap();
        std::fs::write(temp.path().join("abc.pdf"), b"").unwrap();
        let att = attachment(temp.path(), "abc.pdf", b"%PDF-1.4 body");

        assert!(store.persist(&att).await.unwrap());
        assert_eq!(store.read("abc.pdf").await.unwrap(), b"%PDF-1.4 body");
        assert!(!store.persist(&att).await.unwrap());
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temporary_files() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path()).await.unwrap();
        let att = attachment(temp.path(), "abc123.pdf", b"%PDF-1.4 body");

        store.persist(&att).await.unwrap();
        store.persist(&att).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["abc123.pdf"]);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path()).await.unwrap();

        let err = store.read("missing.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(!store.exists("missing.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path().join("attachments"))
            .await
            .unwrap();

        for key in ["../secret", "a/b.txt", "..", "", "/etc/passwd", "a\\b"] {
            let err = store.read(key).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {:?}", key);
        }
    }
}
