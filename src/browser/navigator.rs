//! Page navigation in one browser tab.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, Page};
use tokio::time::{sleep, timeout, Instant};

use crate::browser::identity::random_user_agent;
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::media::selectors::{content_marker, overlay_dismiss};
use crate::media::DownloadRequest;

/// Interval between selector checks while waiting for content.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeouts and viewport for one page load.
#[derive(Debug, Clone)]
pub struct NavigationSettings {
    pub navigation_timeout: Duration,
    pub content_timeout: Duration,
    pub overlay_timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl From<&BrowserConfig> for NavigationSettings {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            content_timeout: config.content_timeout(),
            overlay_timeout: config.overlay_timeout(),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self::from(&BrowserConfig::default())
    }
}

/// The rendered DOM of a post page, captured after it settled.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    /// User agent the page was loaded with; asset requests reuse it.
    pub user_agent: String,
}

/// Writes each image's laid-out size into data attributes, so the extractor
/// can see sizes that only CSS decides. Falls back to the natural size for
/// images that are not laid out.
const STAMP_IMAGE_SIZES: &str = r#"(() => {
    let stamped = 0;
    for (const img of document.querySelectorAll('img')) {
        const rect = img.getBoundingClientRect();
        const width = Math.round(rect.width) || img.naturalWidth || 0;
        const height = Math.round(rect.height) || img.naturalHeight || 0;
        img.setAttribute('data-rendered-width', String(width));
        img.setAttribute('data-rendered-height', String(height));
        stamped++;
    }
    return stamped;
})()"#;

/// The tab operations a page load needs.
#[async_trait]
trait PageTab: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;
    async fn set_viewport(&self, width: u32, height: u32) -> Result<()>;
    async fn goto(&self, url: &str) -> Result<()>;
    async fn has_element(&self, selector: &str) -> bool;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn run_script(&self, script: &str) -> Result<()>;
    async fn content(&self) -> Result<String>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl PageTab for Page {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
            .map_err(|e| Error::Navigation(format!("Could not set user agent: {}", e)))?;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(width),
            i64::from(height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| Error::Navigation(format!("Could not set viewport: {}", e)))?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        Page::goto(self, url)
            .await
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn has_element(&self, selector: &str) -> bool {
        self.find_element(selector).await.is_ok()
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .find_element(selector)
            .await
            .map_err(|e| Error::Navigation(format!("{} vanished: {}", selector, e)))?;
        element
            .click()
            .await
            .map_err(|e| Error::Navigation(format!("Click on {} failed: {}", selector, e)))?;
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<()> {
        self.evaluate(script)
            .await
            .map_err(|e| Error::Navigation(format!("Script failed: {}", e)))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Page::content(self)
            .await
            .map_err(|e| Error::Navigation(format!("Could not read page content: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        Page::close(self.clone())
            .await
            .map_err(|e| Error::Navigation(format!("Could not close tab: {}", e)))
    }
}

/// Open a tab, load the post and capture its DOM.
///
/// The tab is closed before returning, whatever the outcome.
pub async fn load_page(
    browser: &Browser,
    request: &DownloadRequest,
    settings: &NavigationSettings,
) -> Result<PageSnapshot> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| Error::Navigation(format!("Could not open a tab: {}", e)))?;

    capture(&page, request, settings).await
}

async fn capture<T: PageTab>(
    tab: &T,
    request: &DownloadRequest,
    settings: &NavigationSettings,
) -> Result<PageSnapshot> {
    let result = drive(tab, request, settings).await;

    if let Err(e) = tab.close().await {
        tracing::debug!("Closing tab for {} failed: {}", request.url(), e);
    }

    result
}

async fn drive<T: PageTab>(
    tab: &T,
    request: &DownloadRequest,
    settings: &NavigationSettings,
) -> Result<PageSnapshot> {
    let url = request.url();
    let user_agent = random_user_agent();

    tab.set_user_agent(user_agent).await?;
    tab.set_viewport(settings.viewport_width, settings.viewport_height)
        .await?;

    tracing::debug!("Navigating to {}", url);
    match timeout(settings.navigation_timeout, tab.goto(url)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(Error::Navigation(format!(
                "Timed out after {}s loading {}",
                settings.navigation_timeout.as_secs(),
                url
            )))
        }
    }

    let marker = content_marker(request.platform(), request.content_type());
    if wait_for_selector(tab, marker, settings.content_timeout).await {
        tracing::debug!("Main content rendered on {}", url);
    } else {
        tracing::warn!(
            "Main content marker not found on {} within {}s, extracting anyway",
            url,
            settings.content_timeout.as_secs()
        );
    }

    dismiss_overlay(tab, request, settings.overlay_timeout).await;

    if let Err(e) = tab.run_script(STAMP_IMAGE_SIZES).await {
        tracing::warn!("Could not measure images on {}: {}", url, e);
    }

    let html = tab.content().await?;

    Ok(PageSnapshot {
        url: url.to_string(),
        html,
        user_agent: user_agent.to_string(),
    })
}

/// Poll for a selector until it appears or the deadline passes.
async fn wait_for_selector<T: PageTab>(tab: &T, selector: &str, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if tab.has_element(selector).await {
            return true;
        }
        if Instant::now() + POLL_INTERVAL > deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Close the login/consent overlay if one shows up.
async fn dismiss_overlay<T: PageTab>(tab: &T, request: &DownloadRequest, limit: Duration) {
    let selector = overlay_dismiss(request.platform());
    if !wait_for_selector(tab, selector, limit).await {
        tracing::debug!("No overlay on {}", request.url());
        return;
    }

    match tab.click(selector).await {
        Ok(()) => tracing::debug!("Dismissed overlay on {}", request.url()),
        Err(e) => tracing::debug!("Overlay not dismissed on {}: {}", request.url(), e),
    }
}
