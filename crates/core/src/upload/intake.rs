//! Per-request intake: admission checks, routing, naming and streaming.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::error;

use super::classify::Destination;
use super::error::UploadError;
use super::naming::stored_name;
use super::policy::UploadPolicy;
use crate::storage::{FileSink, StorageError, StorageService};

/// A form field that may carry files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// Multipart field name.
    pub name: String,
    /// Maximum files on this field; `None` is unbounded.
    pub max_count: Option<usize>,
}

impl FieldRule {
    /// Create a rule for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, max_count: Option<usize>) -> Self {
        Self {
            name: name.into(),
            max_count,
        }
    }
}

/// Which fields an endpoint accepts files on, and how many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionShape {
    rules: Vec<FieldRule>,
}

impl SubmissionShape {
    /// Default cap for [`SubmissionShape::array`].
    pub const DEFAULT_ARRAY_MAX: usize = 5;

    /// Exactly one file on `field`.
    #[must_use]
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            rules: vec![FieldRule::new(field, Some(1))],
        }
    }

    /// Several files on one field, at most `max_count` (default 5).
    #[must_use]
    pub fn array(field: impl Into<String>, max_count: Option<usize>) -> Self {
        Self {
            rules: vec![FieldRule::new(
                field,
                Some(max_count.unwrap_or(Self::DEFAULT_ARRAY_MAX)),
            )],
        }
    }

    /// Several named fields, each with its own cap.
    #[must_use]
    pub fn fields(rules: impl IntoIterator<Item = FieldRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Whether the `nth` file (1-based) on `field` is acceptable.
    #[must_use]
    pub fn admits(&self, field: &str, nth: usize) -> bool {
        self.rules
            .iter()
            .find(|rule| rule.name == field)
            .is_some_and(|rule| rule.max_count.is_none_or(|max| nth <= max))
    }
}

/// Header data of one file part, as declared by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingPart {
    /// Multipart field name.
    pub field: String,
    /// Client-supplied file name. Untrusted.
    pub original_name: String,
    /// Client-supplied content-type. Untrusted.
    pub content_type: String,
}

impl IncomingPart {
    /// Content-type assumed when a file part declares none.
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/octet-stream";

    /// Create a part, defaulting a missing content-type.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        original_name: impl Into<String>,
        content_type: Option<&str>,
    ) -> Self {
        Self {
            field: field.into(),
            original_name: original_name.into(),
            content_type: content_type
                .unwrap_or(Self::DEFAULT_CONTENT_TYPE)
                .to_string(),
        }
    }
}

/// A file accepted and written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Multipart field name.
    pub field: String,
    /// Client-supplied file name.
    pub original_name: String,
    /// Generated name on disk.
    pub stored_name: String,
    /// Folder the file was routed to.
    pub destination: Destination,
    /// Declared content-type.
    pub content_type: String,
    /// Bytes written.
    pub size: u64,
    /// Storage key, `{folder}/{stored_name}`.
    pub storage_key: String,
    /// Path on disk.
    pub path: PathBuf,
}

/// Intake state for one upload request.
///
/// Parts are fed in arrival order. The first rejection fails the request;
/// the caller then calls [`IntakeBatch::rollback`] to remove what was stored.
pub struct IntakeBatch {
    policy: Arc<UploadPolicy>,
    storage: Arc<StorageService>,
    shape: SubmissionShape,
    files_seen: usize,
    per_field: HashMap<String, usize>,
    stored: Vec<StoredFile>,
}

impl IntakeBatch {
    /// Start a batch for one request.
    #[must_use]
    pub fn new(
        policy: Arc<UploadPolicy>,
        storage: Arc<StorageService>,
        shape: SubmissionShape,
    ) -> Self {
        Self {
            policy,
            storage,
            shape,
            files_seen: 0,
            per_field: HashMap::new(),
            stored: Vec::new(),
        }
    }

    /// Run the checks that precede any write: request file count, field
    /// admission, then type validation.
    pub fn admit(&mut self, part: &IncomingPart) -> Result<(), UploadError> {
        self.files_seen += 1;
        let max_files = self.policy.limits.max_files;
        if self.files_seen > max_files {
            return Err(UploadError::TooManyFiles { max: max_files });
        }

        let nth = self.per_field.entry(part.field.clone()).or_insert(0);
        *nth += 1;
        if !self.shape.admits(&part.field, *nth) {
            return Err(UploadError::UnexpectedField {
                field: part.field.clone(),
            });
        }

        self.policy
            .types
            .check(&part.original_name, &part.content_type)
    }

    /// Admit a file part and stream its body into its destination folder.
    ///
    /// A body that exceeds the size cap or fails mid-stream leaves no file
    /// behind.
    pub async fn accept<S, E>(
        &mut self,
        part: IncomingPart,
        body: S,
    ) -> Result<&StoredFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        self.admit(&part)?;

        let destination = Destination::classify(&part.content_type);
        let stored_name = stored_name(&part.original_name);
        let mut sink = self.storage.open(destination, &stored_name).await?;

        let size = match self.stream_into(&mut sink, &part.field, body).await {
            Ok(()) => sink.finish().await?,
            Err(e) => {
                let key = sink.key().to_string();
                if let Err(cleanup) = self.storage.discard(sink).await {
                    error!(
                        error = %cleanup,
                        storage_key = %key,
                        "Failed to remove partial upload"
                    );
                }
                return Err(e);
            }
        };

        let storage_key = StorageService::storage_key(destination, &stored_name);
        let path = self.storage.path_for(destination, &stored_name);
        self.stored.push(StoredFile {
            field: part.field,
            original_name: part.original_name,
            stored_name,
            destination,
            content_type: part.content_type,
            size,
            storage_key,
            path,
        });
        Ok(&self.stored[self.stored.len() - 1])
    }

    async fn stream_into<S, E>(
        &self,
        sink: &mut FileSink,
        field: &str,
        body: S,
    ) -> Result<(), UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let limits = &self.policy.limits;
        let mut body = pin!(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| UploadError::malformed(e.to_string()))?;
            let len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            if sink.written().saturating_add(len) > limits.max_file_size {
                return Err(UploadError::FileTooLarge {
                    field: field.to_string(),
                    limit: limits.max_file_size_label.clone(),
                });
            }
            sink.write(chunk).await?;
        }
        Ok(())
    }

    /// Files accepted so far.
    #[must_use]
    pub fn stored(&self) -> &[StoredFile] {
        &self.stored
    }

    /// Consume the batch, returning every accepted file.
    #[must_use]
    pub fn into_stored(self) -> Vec<StoredFile> {
        self.stored
    }

    /// Remove every file this batch stored.
    ///
    /// All removals are attempted; the first failure is returned.
    pub async fn rollback(self) -> Result<(), StorageError> {
        let mut first_error = None;
        for file in &self.stored {
            if let Err(e) = self.storage.delete(&file.storage_key).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
