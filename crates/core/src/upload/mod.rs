//! File intake rules.
//!
//! This module decides what happens to each file part of an upload request:
//! - Classification of the declared content-type into a destination folder
//! - Stored-name generation
//! - Extension and content-type validation against the type policy
//! - Per-file size and per-request count limits
//! - Translation of rejections into client payloads

pub mod classify;
pub mod error;
pub mod intake;
pub mod limits;
pub mod naming;
pub mod policy;

#[cfg(test)]
mod intake_props;

pub use classify::Destination;
pub use error::{ErrorPayload, UploadError};
pub use intake::{FieldRule, IncomingPart, IntakeBatch, StoredFile, SubmissionShape};
pub use limits::{UploadLimits, parse_size, try_parse_size};
pub use naming::{extension_of, stored_name};
pub use policy::{KNOWN_TYPES, TypePolicy, UploadPolicy, known_content_type};
