//! Core intake logic for SiteVault.
//!
//! This crate contains the upload rules and the storage adapter with ZERO web
//! dependencies. HTTP handlers feed it file parts; it decides, names, routes
//! and writes them.
//!
//! # Modules
//!
//! - `upload` - Classification, naming, validation, limits and rejections
//! - `storage` - Directory provisioning and streamed writes via OpenDAL

pub mod storage;
pub mod upload;
