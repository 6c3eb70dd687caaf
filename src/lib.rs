//! postgrab - media downloader for public social media posts
//!
//! This library fetches the photo or video behind an Instagram or Facebook
//! post by rendering the page in a pooled headless browser.
//!
//! # Features
//!
//! - Bounded browser pool with first-come, first-served waiting
//! - Media extraction from a rendered DOM snapshot
//! - Streamed downloads with partial-file cleanup
//! - Substitute content when the real media is unavailable
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use postgrab::{ChromeLauncher, Config, DownloadRequest, Downloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("postgrab.toml"))?;
//!     let downloader = Downloader::new(ChromeLauncher::new(config.browser.clone()), &config)?;
//!
//!     let request = DownloadRequest::from_url("https://www.instagram.com/p/C0abcdEFG/")?;
//!     let manifest = downloader.download(&request).await?;
//!     println!("saved {}", manifest.local_filename);
//!
//!     downloader.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use browser::{BrowserPool, ChromeLauncher};
pub use config::{Config, ContentType, Platform};
pub use download::{Downloader, RunStats};
pub use error::{Error, Result};
pub use media::{DownloadManifest, DownloadRequest, MediaKind};
