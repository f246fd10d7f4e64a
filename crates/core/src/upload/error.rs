//! Upload rejection kinds and their client-facing payloads.

use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Why an upload request was rejected.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A file exceeded the per-file byte cap.
    #[error("file in field '{field}' exceeds the {limit} limit")]
    FileTooLarge {
        /// Form field that carried the file.
        field: String,
        /// Configured cap as shown to clients.
        limit: String,
    },

    /// The request carried more file parts than allowed.
    #[error("request exceeds {max} files")]
    TooManyFiles {
        /// Maximum file parts per request.
        max: usize,
    },

    /// A file arrived on a field the endpoint does not accept, or beyond
    /// that field's maximum count.
    #[error("unexpected file field '{field}'")]
    UnexpectedField {
        /// The offending field name.
        field: String,
    },

    /// Extension not allowed, or declared content-type does not match it.
    #[error("File type not allowed. Allowed types: {}", .allowed.join(", "))]
    TypeNotAllowed {
        /// Currently allowed extensions.
        allowed: Vec<String>,
    },

    /// The multipart body could not be parsed.
    #[error("malformed upload: {0}")]
    Malformed(String),

    /// Writing or cleaning up a stored file failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Uniform body returned for a rejected upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Always `false`.
    pub success: bool,
    /// Human-readable reason.
    pub message: String,
    /// Raw parser detail, for unclassified parser errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorPayload {
    /// Create a payload with no parser detail.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: None,
        }
    }
}

impl UploadError {
    /// Create a malformed-body error.
    #[must_use]
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }

    /// Returns the error code for logs and API consumers.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::TooManyFiles { .. } => "TOO_MANY_FILES",
            Self::UnexpectedField { .. } => "UNEXPECTED_FIELD",
            Self::TypeNotAllowed { .. } => "TYPE_NOT_ALLOWED",
            Self::Malformed(_) => "MALFORMED_UPLOAD",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Translate into the payload sent with a bad-request status.
    ///
    /// Returns `None` for storage failures, which belong to the generic
    /// server-error path.
    #[must_use]
    pub fn client_payload(&self) -> Option<ErrorPayload> {
        let payload = match self {
            Self::FileTooLarge { limit, .. } => {
                ErrorPayload::new(format!("File too large. Maximum size: {limit}"))
            }
            Self::TooManyFiles { max } => {
                ErrorPayload::new(format!("Too many files. Maximum {max} files allowed"))
            }
            Self::UnexpectedField { .. } => ErrorPayload::new("Unexpected field name"),
            Self::Malformed(detail) => ErrorPayload {
                error: Some(detail.clone()),
                ..ErrorPayload::new("File upload error")
            },
            Self::TypeNotAllowed { .. } => ErrorPayload::new(self.to_string()),
            Self::Storage(_) => return None,
        };
        Some(payload)
    }
}
