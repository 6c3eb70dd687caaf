//! Filesystem module.
//!
//! Provides:
//! - Destination directory and partial-file management
//! - Collision-free filename generation
//! - Human-readable size labels

pub mod naming;
pub mod paths;
pub mod size;

pub use naming::{choose_extension, sanitize_filename, unique_media_filename};
pub use paths::{destination_path, ensure_dir, remove_partial};
pub use size::format_size;
