//! Download pipeline.
//!
//! This module provides:
//! - Request lifecycle tracking and run statistics
//! - Streamed asset fetching
//! - Substitute content when the real media is unavailable
//! - The orchestrator tying browser, extractor and fetcher together

pub mod fallback;
pub mod fetcher;
pub mod orchestrator;
pub mod state;

pub use fallback::FallbackProvider;
pub use fetcher::AssetFetcher;
pub use orchestrator::Downloader;
pub use state::{RunStats, Stage, StageTracker};
