//! Upload routes.
//!
//! Every upload route drains the multipart body part by part through an
//! [`IntakeBatch`]. The first rejection fails the whole request and removes
//! any file already stored for it.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{Field, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::AppState;
use sitevault_core::storage::StorageError;
use sitevault_core::upload::{
    Destination, ErrorPayload, FieldRule, IncomingPart, IntakeBatch, StoredFile, SubmissionShape,
    UploadError,
};

/// Longest accepted value for a non-file form field.
const MAX_FIELD_VALUE_BYTES: usize = 1024 * 1024;

/// Cap per named field on `/uploads/fields`.
const NAMED_FIELD_MAX: usize = 10;

/// Creates the upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/single", post(upload_single))
        .route("/uploads/multiple", post(upload_multiple))
        .route("/uploads/fields", post(upload_fields))
        // The intake limiter enforces sizes per file.
        .layer(DefaultBodyLimit::disable())
        .route("/uploads/{folder}/{name}", get(get_metadata))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body returned when every file part was accepted.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Fixed confirmation message.
    pub message: &'static str,
    /// Accepted files in arrival order.
    pub files: Vec<StoredFile>,
    /// Non-file form fields.
    pub fields: BTreeMap<String, String>,
}

/// Metadata of a stored file.
#[derive(Debug, Serialize)]
pub struct StoredFileMetadata {
    /// Destination folder.
    pub folder: Destination,
    /// Stored name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Storage key, `{folder}/{name}`.
    pub storage_key: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/uploads/single`
/// One file under field `file`.
async fn upload_single(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_intake(&state, SubmissionShape::single("file"), multipart).await
}

/// POST `/uploads/multiple`
/// Up to five files under field `files`.
async fn upload_multiple(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run_intake(&state, SubmissionShape::array("files", None), multipart).await
}

/// POST `/uploads/fields`
/// Files under `documents`, `images` and `reports`.
async fn upload_fields(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let shape = SubmissionShape::fields(
        Destination::ALL
            .iter()
            .map(|d| FieldRule::new(d.as_str(), Some(NAMED_FIELD_MAX))),
    );
    run_intake(&state, shape, multipart).await
}

/// GET `/uploads/{folder}/{name}`
/// Metadata of a stored file.
async fn get_metadata(
    State(state): State<AppState>,
    Path((folder, name)): Path<(String, String)>,
) -> Response {
    let Some(destination) = Destination::parse(&folder) else {
        return not_found();
    };

    match state.storage.metadata(destination, &name).await {
        Ok(meta) => (
            StatusCode::OK,
            Json(StoredFileMetadata {
                folder: destination,
                name,
                size: meta.file_size,
                storage_key: meta.storage_key,
            }),
        )
            .into_response(),
        Err(StorageError::NotFound { .. } | StorageError::InvalidKey(_)) => not_found(),
        Err(e) => {
            error!(error = %e, folder = %destination, "Failed to read file metadata");
            internal_error()
        }
    }
}

// ============================================================================
// Intake
// ============================================================================

async fn run_intake(
    state: &AppState,
    shape: SubmissionShape,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error_response(&UploadError::malformed(rejection.body_text())),
    };

    let mut batch = IntakeBatch::new(state.policy.clone(), state.storage.clone(), shape);
    match drain(&mut multipart, &mut batch).await {
        Ok(fields) => {
            let files = batch.into_stored();
            info!(files = files.len(), "Upload accepted");
            (
                StatusCode::CREATED,
                Json(UploadResponse {
                    success: true,
                    message: "Files uploaded successfully",
                    files,
                    fields,
                }),
            )
                .into_response()
        }
        Err(e) => {
            let stored = batch.stored().len();
            if let Err(rollback) = batch.rollback().await {
                error!(error = %rollback, stored, "Failed to remove files of a rejected upload");
            }
            error_response(&e)
        }
    }
}

/// Feed every part of the body to the batch, collecting text fields.
async fn drain(
    multipart: &mut Multipart,
    batch: &mut IntakeBatch,
) -> Result<BTreeMap<String, String>, UploadError> {
    let mut fields = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::malformed(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            let value = read_text(field).await?;
            fields.insert(name, value);
            continue;
        };

        let part = IncomingPart::new(name, file_name, field.content_type());
        let stored = batch.accept(part, field).await?;
        info!(
            field = %stored.field,
            stored_name = %stored.stored_name,
            folder = %stored.destination,
            size = stored.size,
            "File stored"
        );
    }

    Ok(fields)
}

async fn read_text(mut field: Field<'_>) -> Result<String, UploadError> {
    let mut value = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::malformed(e.body_text()))?
    {
        if value.len() + chunk.len() > MAX_FIELD_VALUE_BYTES {
            return Err(UploadError::malformed("Field value too long"));
        }
        value.extend_from_slice(&chunk);
    }
    String::from_utf8(value).map_err(|_| UploadError::malformed("Field value is not valid UTF-8"))
}

// ============================================================================
// Responses
// ============================================================================

fn error_response(err: &UploadError) -> Response {
    match err.client_payload() {
        Some(payload) => {
            warn!(code = err.error_code(), error = %err, "Upload rejected");
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        None => {
            error!(code = err.error_code(), error = %err, "Upload failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorPayload::new("Internal server error")),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorPayload::new("File not found"))).into_response()
}
