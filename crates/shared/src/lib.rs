//! Shared configuration for SiteVault.
//!
//! Settings are layered from optional config files, `SITEVAULT__*` variables
//! and the bare `MAX_FILE_SIZE` / `ALLOWED_FILE_TYPES` variables.

pub mod config;

pub use config::{AppConfig, ServerConfig, UploadSettings};
