//! Configuration module for postgrab.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Platform and content type definitions
//! - Configuration validation and post URL recognition

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{BrowserConfig, Config, FallbackConfig, FetchConfig, StorageConfig};
pub use modes::{ContentType, Platform};
pub use validation::{parse_post_url, validate_config};
