//! Destination folders and content-type routing.

use std::fmt;

use serde::Serialize;

/// Folder under the upload root where an accepted file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// PDFs, office documents and every unrecognized type.
    Documents,
    /// Anything declared as `image/*`.
    Images,
    /// Generated reports. Provisioned, never chosen by [`Destination::classify`].
    Reports,
}

impl Destination {
    /// Every destination, in provisioning order.
    pub const ALL: [Self; 3] = [Self::Documents, Self::Images, Self::Reports];

    /// Directory name relative to the upload root.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Images => "images",
            Self::Reports => "reports",
        }
    }

    /// Parse a directory name back into a destination.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "documents" => Some(Self::Documents),
            "images" => Some(Self::Images),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    /// Pick the destination for a declared content-type.
    ///
    /// Total over all strings. Matching is case-sensitive, and anything that
    /// is not an image lands in `documents`, including spreadsheets.
    #[must_use]
    #[allow(clippy::if_same_then_else)] // explicit document rule ahead of the fallback
    pub fn classify(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            Self::Images
        } else if content_type.contains("pdf") || content_type.contains("document") {
            Self::Documents
        } else {
            Self::Documents
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
