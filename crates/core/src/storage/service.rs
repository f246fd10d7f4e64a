//! Storage service implementation using Apache OpenDAL.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use opendal::{ErrorKind, Operator, Writer, services};

use super::config::StorageConfig;
use super::error::StorageError;
use crate::upload::Destination;

/// Size and location of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Storage key, `{folder}/{name}`.
    pub storage_key: String,
    /// File size in bytes.
    pub file_size: u64,
}

/// An open file being streamed into storage.
pub struct FileSink {
    key: String,
    writer: Writer,
    written: u64,
}

impl FileSink {
    /// Storage key being written.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bytes written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a chunk.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), StorageError> {
        let len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        self.writer.write(chunk).await?;
        self.written = self.written.saturating_add(len);
        Ok(())
    }

    /// Flush and close the file, returning its size.
    pub async fn finish(mut self) -> Result<u64, StorageError> {
        self.writer.close().await?;
        Ok(self.written)
    }
}

/// Storage service for uploaded files.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(config.root())?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL filesystem operator rooted at the upload root.
    fn create_operator(root: &Path) -> Result<Operator, StorageError> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .join(root)
        };

        let builder = services::Fs::default().root(
            root.to_str()
                .ok_or_else(|| StorageError::configuration("invalid path"))?,
        );

        Ok(Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish())
    }

    /// Create the upload root and every destination folder.
    ///
    /// Idempotent. Must complete before the first upload is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Provision`] naming the directory that failed.
    pub async fn provision(&self) -> Result<(), StorageError> {
        for path in self.config.required_dirs() {
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|source| StorageError::Provision { path, source })?;
        }
        Ok(())
    }

    /// Storage key for a file in a destination folder.
    #[must_use]
    pub fn storage_key(destination: Destination, name: &str) -> String {
        format!("{}/{}", destination.as_str(), name)
    }

    /// On-disk path for a file in a destination folder.
    #[must_use]
    pub fn path_for(&self, destination: Destination, name: &str) -> PathBuf {
        self.config.root().join(destination.as_str()).join(name)
    }

    /// Open a new file for streaming.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a single path segment or the file
    /// cannot be created.
    pub async fn open(
        &self,
        destination: Destination,
        name: &str,
    ) -> Result<FileSink, StorageError> {
        validate_name(name)?;
        let key = Self::storage_key(destination, name);
        let writer = self.operator.writer(&key).await?;
        Ok(FileSink {
            key,
            writer,
            written: 0,
        })
    }

    /// Abort a partially written file and remove whatever reached disk.
    ///
    /// # Errors
    ///
    /// Returns the removal error if the partial file may still exist,
    /// otherwise any error from aborting the writer.
    pub async fn discard(&self, mut sink: FileSink) -> Result<(), StorageError> {
        let aborted = sink.writer.abort().await;
        // Removal covers writers that already flushed data.
        self.operator.delete(&sink.key).await?;
        aborted.map_err(StorageError::from)
    }

    /// Size of a stored file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist and
    /// [`StorageError::InvalidKey`] if `name` is not a plain file name.
    pub async fn metadata(
        &self,
        destination: Destination,
        name: &str,
    ) -> Result<FileMetadata, StorageError> {
        validate_name(name)?;
        let key = Self::storage_key(destination, name);
        let meta = match self.operator.stat(&key).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::not_found(key)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::not_found(key)),
            Err(e) => return Err(e.into()),
        };

        Ok(FileMetadata {
            storage_key: key,
            file_size: meta.content_length(),
        })
    }

    /// Delete a file from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Check if a file exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.exists(key).await.unwrap_or(false)
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

/// Reject names that would escape their destination folder.
fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidKey(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_in(dir: &tempfile::TempDir) -> StorageService {
        StorageService::from_config(StorageConfig::new(dir.path().join("uploads")))
            .expect("should create service")
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("abc-123.pdf").is_ok());
        assert!(validate_name(".hidden").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a\\b.png").is_err());
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(
            StorageService::storage_key(Destination::Images, "x.png"),
            "images/x.png"
        );
    }

    #[tokio::test]
    async fn test_provision_creates_all_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);

        service.provision().await.expect("provision");

        for path in service.config().required_dirs() {
            assert!(path.is_dir(), "{} should exist", path.display());
        }
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);

        service.provision().await.expect("first provision");
        service.provision().await.expect("second provision");
        assert!(dir.path().join("uploads/reports").is_dir());
    }

    #[tokio::test]
    async fn test_provision_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").expect("write blocker");

        let service = StorageService::from_config(StorageConfig::new(blocker.join("uploads")));
        let result = match service {
            Ok(service) => service.provision().await,
            Err(e) => Err(e),
        };
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_and_stat() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);
        service.provision().await.expect("provision");

        let mut sink = service
            .open(Destination::Documents, "spec.pdf")
            .await
            .expect("open");
        sink.write(Bytes::from_static(b"%PDF-")).await.expect("write");
        sink.write(Bytes::from_static(b"1.7")).await.expect("write");
        assert_eq!(sink.key(), "documents/spec.pdf");
        assert_eq!(sink.finish().await.expect("finish"), 8);

        let on_disk = service.path_for(Destination::Documents, "spec.pdf");
        assert_eq!(std::fs::read(on_disk).expect("read"), b"%PDF-1.7");

        let meta = service
            .metadata(Destination::Documents, "spec.pdf")
            .await
            .expect("metadata");
        assert_eq!(meta.file_size, 8);
        assert_eq!(meta.storage_key, "documents/spec.pdf");
        assert!(service.exists("documents/spec.pdf").await);
    }

    #[tokio::test]
    async fn test_discard_removes_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);
        service.provision().await.expect("provision");

        let mut sink = service
            .open(Destination::Images, "partial.png")
            .await
            .expect("open");
        sink.write(Bytes::from_static(b"\x89PNG")).await.expect("write");
        service.discard(sink).await.expect("discard");

        assert!(!service.exists("images/partial.png").await);
    }

    #[tokio::test]
    async fn test_discard_unwritten_sink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);
        service.provision().await.expect("provision");

        let sink = service
            .open(Destination::Documents, "empty.pdf")
            .await
            .expect("open");
        service.discard(sink).await.expect("discard");

        assert!(!service.exists("documents/empty.pdf").await);
    }

    #[tokio::test]
    async fn test_metadata_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);
        service.provision().await.expect("provision");

        let err = service
            .metadata(Destination::Reports, "nope.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let err = service
            .metadata(Destination::Reports, "../secret")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(&dir);
        service.provision().await.expect("provision");

        let mut sink = service
            .open(Destination::Documents, "gone.doc")
            .await
            .expect("open");
        sink.write(Bytes::from_static(b"\xd0\xcf")).await.expect("write");
        sink.finish().await.expect("finish");
        assert!(service.exists("documents/gone.doc").await);

        service.delete("documents/gone.doc").await.expect("delete");
        assert!(!service.exists("documents/gone.doc").await);
    }
}
