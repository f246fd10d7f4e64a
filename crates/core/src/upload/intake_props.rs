//! Property-based tests for the intake rules.

use proptest::prelude::*;

use super::classify::Destination;
use super::limits::{UploadLimits, parse_size, try_parse_size};
use super::naming::{extension_of, stored_name};
use super::policy::{KNOWN_TYPES, TypePolicy};

/// Strategy for an allowed extension and its expected content-type.
fn known_type() -> impl Strategy<Value = (&'static str, &'static str)> {
    proptest::sample::select(KNOWN_TYPES)
}

/// Strategy for a file stem without dots or separators.
fn stem() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _-]{1,24}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every `image/*` content-type is routed to `images`.
    #[test]
    fn prop_images_route_to_images(subtype in "[a-z0-9.+-]{0,20}") {
        let content_type = format!("image/{subtype}");
        prop_assert_eq!(Destination::classify(&content_type), Destination::Images);
    }

    /// Anything that is not `image/*` is routed to `documents`.
    #[test]
    fn prop_non_images_route_to_documents(content_type in ".*") {
        prop_assume!(!content_type.starts_with("image/"));
        prop_assert_eq!(Destination::classify(&content_type), Destination::Documents);
    }

    /// Two names generated for the same file differ and keep its extension.
    #[test]
    fn prop_stored_names_unique_and_keep_extension(
        stem in stem(),
        ext in "[A-Za-z0-9]{1,6}",
    ) {
        let original = format!("{stem}.{ext}");
        let a = stored_name(&original);
        let b = stored_name(&original);
        prop_assert_ne!(&a, &b);
        let dotted = format!(".{ext}");
        prop_assert_eq!(extension_of(&a), dotted.as_str());
        prop_assert!(b.ends_with(&dotted));
    }

    /// Whole units scale by exact powers of 1024.
    #[test]
    fn prop_parse_size_units(n in 0u64..100_000, unit_idx in 0usize..4) {
        let (unit, multiplier) = [
            ("B", 1u64),
            ("KB", 1024),
            ("MB", 1024 * 1024),
            ("GB", 1024 * 1024 * 1024),
        ][unit_idx];
        let compact = format!("{n}{unit}");
        let spaced = format!("{n} {}", unit.to_lowercase());
        prop_assert_eq!(try_parse_size(&compact), Some(n * multiplier));
        prop_assert_eq!(try_parse_size(&spaced), Some(n * multiplier));
    }

    /// Strings that are not sizes fall back to the 10MB default.
    #[test]
    fn prop_parse_size_fallback(raw in "[a-zA-Z ]*") {
        prop_assert_eq!(parse_size(Some(&raw)), UploadLimits::DEFAULT_MAX_FILE_SIZE);
    }

    /// A known file is accepted exactly when declared with its mapped type,
    /// whatever the case of its extension.
    #[test]
    fn prop_validator_requires_exact_type(
        (ext, expected) in known_type(),
        stem in stem(),
        upper in any::<bool>(),
        declared in "[a-z]{1,11}/[a-z0-9.-]{1,20}",
    ) {
        let policy = TypePolicy::default();
        let ext = if upper { ext.to_uppercase() } else { ext.to_string() };
        let name = format!("{stem}.{ext}");

        prop_assert!(policy.check(&name, expected).is_ok());
        prop_assert_eq!(policy.check(&name, &declared).is_ok(), declared == expected);
    }

    /// Extensions outside the policy are rejected for any content-type.
    #[test]
    fn prop_validator_rejects_unlisted(
        stem in stem(),
        ext in "[a-z]{1,5}",
        declared in ".*",
    ) {
        let policy = TypePolicy::from_allow_list("pdf");
        prop_assume!(ext != "pdf");
        let name = format!("{stem}.{ext}");
        prop_assert!(policy.check(&name, &declared).is_err());
    }
}
