//! Media module: request and result types, and extraction from rendered pages.

pub mod item;
pub mod manifest;
pub mod parser;
pub mod request;
pub mod selectors;

pub use item::{MediaCandidate, MediaKind};
pub use manifest::{DownloadManifest, StoredFile};
pub use parser::extract_media;
pub use request::DownloadRequest;
