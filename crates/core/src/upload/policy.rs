//! Extension allow-list and the upload policy built from configuration.

use super::error::UploadError;
use super::limits::UploadLimits;
use super::naming::extension_of;

/// Built-in extension to content-type table, in default allow-list order.
pub const KNOWN_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

/// Look up the built-in content-type for a lower-cased extension.
#[must_use]
pub fn known_content_type(extension: &str) -> Option<&'static str> {
    KNOWN_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// Allowed extensions, each tied to exactly one expected content-type.
///
/// The allowed extensions are the keys of the table, so the allow-list and
/// the content-type mapping cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePolicy {
    entries: Vec<(String, String)>,
    ignored: Vec<String>,
}

impl TypePolicy {
    /// Build a policy from explicit `(extension, content_type)` pairs.
    ///
    /// Extensions are lower-cased; a later duplicate replaces an earlier one.
    #[must_use]
    pub fn new<I, E, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (E, C)>,
        E: Into<String>,
        C: Into<String>,
    {
        let mut policy = Self {
            entries: Vec::new(),
            ignored: Vec::new(),
        };
        for (ext, content_type) in entries {
            policy.insert(ext.into().to_lowercase(), content_type.into());
        }
        policy
    }

    /// Build a policy from a comma-separated allow-list such as
    /// `"pdf,png,csv=text/csv"`.
    ///
    /// A bare extension takes its content-type from [`KNOWN_TYPES`]; one with
    /// no built-in mapping can never be accepted, so it is left out and
    /// reported by [`TypePolicy::ignored`]. `ext=content/type` declares the
    /// mapping inline. A blank list yields the default policy.
    #[must_use]
    pub fn from_allow_list(list: &str) -> Self {
        if list.trim().is_empty() {
            return Self::default();
        }

        let mut policy = Self::new(std::iter::empty::<(String, String)>());
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (ext, declared) = match entry.split_once('=') {
                Some((ext, content_type)) => (ext, Some(content_type.trim())),
                None => (entry, None),
            };
            let ext = ext.trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() {
                policy.ignored.push(entry.to_string());
                continue;
            }

            match declared
                .filter(|c| !c.is_empty())
                .or_else(|| known_content_type(&ext))
            {
                Some(content_type) => policy.insert(ext, content_type.to_string()),
                None => policy.ignored.push(ext),
            }
        }
        policy
    }

    fn insert(&mut self, ext: String, content_type: String) {
        if let Some(existing) = self.entries.iter_mut().find(|(e, _)| *e == ext) {
            existing.1 = content_type;
        } else {
            self.entries.push((ext, content_type));
        }
    }

    /// Allowed extensions in configuration order.
    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }

    /// Expected content-type for a lower-cased extension.
    #[must_use]
    pub fn expected_content_type(&self, extension: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, content_type)| content_type.as_str())
    }

    /// Allow-list entries that were dropped because no content-type is known.
    #[must_use]
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Accept a file only if its extension is allowed and its declared
    /// content-type is exactly the one expected for that extension.
    ///
    /// The extension lookup is case-insensitive; the content-type comparison
    /// is not.
    pub fn check(&self, original_name: &str, content_type: &str) -> Result<(), UploadError> {
        let extension = extension_of(original_name)
            .strip_prefix('.')
            .unwrap_or_default()
            .to_lowercase();

        match self.expected_content_type(&extension) {
            Some(expected) if expected == content_type => Ok(()),
            _ => Err(UploadError::TypeNotAllowed {
                allowed: self.allowed_extensions().map(String::from).collect(),
            }),
        }
    }
}

impl Default for TypePolicy {
    fn default() -> Self {
        Self::new(KNOWN_TYPES.iter().copied())
    }
}

/// Everything the intake pipeline needs to judge an upload.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Extension allow-list.
    pub types: TypePolicy,
    /// Size and count limits.
    pub limits: UploadLimits,
}

impl UploadPolicy {
    /// Build a policy from raw `MAX_FILE_SIZE` and `ALLOWED_FILE_TYPES` values.
    #[must_use]
    pub fn from_settings(max_file_size: Option<&str>, allowed_file_types: Option<&str>) -> Self {
        Self {
            types: allowed_file_types.map_or_else(TypePolicy::default, TypePolicy::from_allow_list),
            limits: UploadLimits::from_setting(max_file_size),
        }
    }
}
