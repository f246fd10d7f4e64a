//! Per-file size cap and per-request file count.

use std::sync::LazyLock;

use regex::Regex;

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([0-9]+)(?:\.([0-9]+))?\s*(B|KB|MB|GB)?$").expect("size pattern is valid")
});

/// Parse a human size string such as `"25MB"` or `"1.5 gb"` into bytes.
///
/// Units are powers of 1024 and case-insensitive; a bare number is bytes.
/// Fractional results are floored exactly and values beyond `u64::MAX`
/// saturate. Returns `None` when the string does not match
/// `<number>[ ]<unit>` with ASCII digits.
#[must_use]
pub fn try_parse_size(raw: &str) -> Option<u64> {
    let caps = SIZE_PATTERN.captures(raw)?;

    let multiplier: u128 = match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()) {
        None => 1,
        Some(unit) => match unit.as_str() {
            "B" => 1,
            "KB" => 1024,
            "MB" => 1024 * 1024,
            "GB" => 1024 * 1024 * 1024,
            _ => return None,
        },
    };

    // The pattern only admits ASCII digits, so a failed parse is overflow.
    let whole: u128 = caps[1].parse().unwrap_or(u128::MAX);
    let mut bytes = whole.saturating_mul(multiplier);

    if let Some(fraction) = caps.get(2) {
        bytes = bytes.saturating_add(floor_fraction(fraction.as_str(), multiplier));
    }

    Some(u64::try_from(bytes).unwrap_or(u64::MAX))
}

/// `floor(0.<digits> * multiplier)`, folded from the last digit so every
/// intermediate stays below `multiplier`.
fn floor_fraction(digits: &str, multiplier: u128) -> u128 {
    digits
        .bytes()
        .rev()
        .fold(0, |acc, d| (u128::from(d - b'0') * multiplier + acc) / 10)
}

/// Parse a configured size, falling back to [`UploadLimits::DEFAULT_MAX_FILE_SIZE`]
/// when it is absent or malformed.
#[must_use]
pub fn parse_size(raw: Option<&str>) -> u64 {
    raw.and_then(try_parse_size)
        .unwrap_or(UploadLimits::DEFAULT_MAX_FILE_SIZE)
}

/// Size and count limits applied to every upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    /// Maximum bytes per file.
    pub max_file_size: u64,
    /// How the size cap is shown to clients, e.g. `"10MB"`.
    pub max_file_size_label: String,
    /// Maximum file parts per request.
    pub max_files: usize,
}

impl UploadLimits {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Label for the default size cap.
    pub const DEFAULT_MAX_FILE_SIZE_LABEL: &'static str = "10MB";
    /// Files accepted in one request. Not configurable.
    pub const MAX_FILES_PER_REQUEST: usize = 10;

    /// Build limits from the raw `MAX_FILE_SIZE` setting.
    ///
    /// A malformed setting is not an error: the default cap and label apply.
    #[must_use]
    pub fn from_setting(raw: Option<&str>) -> Self {
        match raw.and_then(|s| try_parse_size(s).map(|bytes| (s, bytes))) {
            Some((label, bytes)) => Self {
                max_file_size: bytes,
                max_file_size_label: label.to_string(),
                max_files: Self::MAX_FILES_PER_REQUEST,
            },
            None => Self::default(),
        }
    }

    /// Override the byte cap, labelling it in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self.max_file_size_label = format!("{bytes}B");
        self
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            max_file_size_label: Self::DEFAULT_MAX_FILE_SIZE_LABEL.to_string(),
            max_files: Self::MAX_FILES_PER_REQUEST,
        }
    }
}
