//! Configuration structures and loading logic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Headless browser and navigation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Maximum number of browser processes alive at once.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Run the browser without a window.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Hard limit for the initial page load.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// How long to wait for the main content marker before proceeding anyway.
    #[serde(default = "default_content_timeout")]
    pub content_timeout_secs: u64,

    /// How long to look for a login/consent overlay to dismiss.
    #[serde(default = "default_overlay_timeout")]
    pub overlay_timeout_secs: u64,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            headless: true,
            chrome_path: None,
            navigation_timeout_secs: default_navigation_timeout(),
            content_timeout_secs: default_content_timeout(),
            overlay_timeout_secs: default_overlay_timeout(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }

    pub fn overlay_timeout(&self) -> Duration {
        Duration::from_secs(self.overlay_timeout_secs)
    }
}

/// Asset download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Overall limit for one asset download, headers to last byte.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Largest asset accepted, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where downloaded files go and how they are exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Destination directory for downloaded media.
    #[serde(default)]
    pub download_directory: Option<PathBuf>,

    /// URL prefix under which the serving layer exposes the destination directory.
    #[serde(default = "default_served_prefix")]
    pub served_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_directory: None,
            served_prefix: default_served_prefix(),
        }
    }
}

/// Substitute assets served when a post cannot be scraped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_image")]
    pub image_url: String,

    #[serde(default = "default_fallback_video")]
    pub video_url: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            image_url: default_fallback_image(),
            video_url: default_fallback_video(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> usize {
    2
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_content_timeout() -> u64 {
    10
}

fn default_overlay_timeout() -> u64 {
    3
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_max_bytes() -> u64 {
    500 * 1024 * 1024
}

fn default_served_prefix() -> String {
    "/downloads".to_string()
}

fn default_fallback_image() -> String {
    "https://picsum.photos/1080/1080.jpg".to_string()
}

fn default_fallback_video() -> String {
    "https://www.w3schools.com/html/mov_bbb.mp4".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective download directory.
    ///
    /// Falls back to `<user download dir>/postgrab`, then `./downloads`.
    pub fn download_directory(&self) -> PathBuf {
        if let Some(dir) = &self.storage.download_directory {
            return dir.clone();
        }

        directories::UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|d| d.join("postgrab")))
            .unwrap_or_else(|| PathBuf::from("downloads"))
    }
}
