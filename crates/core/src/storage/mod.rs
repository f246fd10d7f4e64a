//! Local storage for accepted uploads using Apache OpenDAL.
//!
//! Layout under the upload root:
//!
//! ```text
//! uploads/
//! ├── documents/
//! ├── images/
//! └── reports/
//! ```
//!
//! Files are addressed by a storage key `{folder}/{stored_name}`.

mod config;
mod error;
mod service;

pub use config::StorageConfig;
pub use error::StorageError;
pub use service::{FileMetadata, FileSink, StorageService};
