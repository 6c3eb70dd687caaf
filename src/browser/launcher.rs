//! Browser process launching.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig as CdpConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::browser::navigator::{load_page, NavigationSettings, PageSnapshot};
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::media::DownloadRequest;

/// A running browser that can render a post page.
#[async_trait]
pub trait BrowserSession: Send + Sync + 'static {
    /// Load the request's page in a fresh tab and capture its DOM.
    async fn snapshot(
        &self,
        request: &DownloadRequest,
        settings: &NavigationSettings,
    ) -> Result<PageSnapshot>;

    /// Whether the underlying process is still usable.
    fn is_alive(&self) -> bool;
}

/// Starts and stops browser processes for the pool.
#[async_trait]
pub trait BrowserLauncher: Send + Sync + 'static {
    type Browser: BrowserSession;

    async fn launch(&self) -> Result<Self::Browser>;

    async fn close(&self, browser: Self::Browser);
}

/// Launches headless Chromium through the DevTools protocol.
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

/// One Chromium process plus the task pumping its DevTools connection.
pub struct ChromeInstance {
    browser: Browser,
    handler: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    profile_dir: PathBuf,
}

#[async_trait]
impl BrowserSession for ChromeInstance {
    async fn snapshot(
        &self,
        request: &DownloadRequest,
        settings: &NavigationSettings,
    ) -> Result<PageSnapshot> {
        load_page(&self.browser, request, settings).await
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Browser = ChromeInstance;

    async fn launch(&self) -> Result<ChromeInstance> {
        // every process gets its own profile so instances share no state
        let profile_dir =
            std::env::temp_dir().join(format!("postgrab-profile-{}", Uuid::new_v4().simple()));

        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .user_data_dir(&profile_dir)
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--mute-audio");

        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| Error::Acquisition(format!("Invalid browser configuration: {}", e)))?;

        tracing::info!("Launching browser (headless={})", self.config.headless);
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| Error::Acquisition(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser event error: {}", e);
                }
            }
            flag.store(false, Ordering::Release);
        });

        Ok(ChromeInstance {
            browser,
            handler,
            alive,
            profile_dir,
        })
    }

    async fn close(&self, mut instance: ChromeInstance) {
        if let Err(e) = instance.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        if let Err(e) = instance.browser.wait().await {
            tracing::debug!("Waiting for browser exit failed: {}", e);
        }
        instance.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&instance.profile_dir).await {
            tracing::debug!(
                "Could not remove profile {}: {}",
                instance.profile_dir.display(),
                e
            );
        }
        tracing::debug!("Browser closed");
    }
}
