//! Stored-name generation.

use chrono::Utc;
use uuid::Uuid;

/// Extension of `filename` including its dot, in its original case.
///
/// Only the last path segment is considered. A name whose only dot is its
/// first character (`.env`) has no extension, and a trailing dot yields `"."`.
#[must_use]
pub fn extension_of(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}

/// Generate the name an accepted file is stored under.
///
/// Format: `{uuid_v4}-{epoch_millis}{ext}`. The UUID keeps names distinct
/// within the same millisecond; the extension is copied verbatim.
#[must_use]
pub fn stored_name(original: &str) -> String {
    format!(
        "{}-{}{}",
        Uuid::new_v4(),
        Utc::now().timestamp_millis(),
        extension_of(original)
    )
}
