//! In-process stand-ins for Chromium used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::browser::{BrowserLauncher, BrowserSession, NavigationSettings, PageSnapshot};
use crate::error::{Error, Result};
use crate::media::DownloadRequest;

/// How a fake page load ends.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Html(String),
    NavigationFails,
    /// Never finishes; gives up at the navigation timeout.
    Hangs,
    /// The browser process dies mid-load.
    Crashes,
}

/// Counters and scripted behaviour shared by every fake browser.
#[derive(Debug, Default)]
pub struct LauncherState {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    /// Number of upcoming launches that should fail.
    pub fail_launches: AtomicUsize,

    pub active_loads: AtomicUsize,
    pub max_active_loads: AtomicUsize,
    pub entered: Mutex<Vec<String>>,
    pages: Mutex<HashMap<String, PageOutcome>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl LauncherState {
    pub fn set_page(&self, url: &str, outcome: PageOutcome) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), outcome);
    }

    /// Hold every page load until a permit is added to the returned semaphore.
    pub fn gate_loads(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn entered(&self) -> Vec<String> {
        self.entered.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    pub state: Arc<LauncherState>,
}

#[derive(Debug)]
pub struct FakeBrowser {
    pub id: usize,
    alive: AtomicBool,
    state: Arc<LauncherState>,
}

impl FakeBrowser {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
            state: Arc::default(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Browser = FakeBrowser;

    async fn launch(&self) -> Result<FakeBrowser> {
        let id = self.state.launches.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;

        let should_fail = self
            .state
            .fail_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Error::Acquisition("chrome binary not found".to_string()));
        }

        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(FakeBrowser {
            id,
            alive: AtomicBool::new(true),
            state: Arc::clone(&self.state),
        })
    }

    async fn close(&self, _browser: FakeBrowser) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn snapshot(
        &self,
        request: &DownloadRequest,
        settings: &NavigationSettings,
    ) -> Result<PageSnapshot> {
        let url = request.url().to_string();
        self.state.entered.lock().unwrap().push(url.clone());

        let active = self.state.active_loads.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active_loads.fetch_max(active, Ordering::SeqCst);

        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        } else {
            tokio::task::yield_now().await;
        }

        self.state.active_loads.fetch_sub(1, Ordering::SeqCst);

        let outcome = self.state.pages.lock().unwrap().get(&url).cloned();
        match outcome {
            Some(PageOutcome::Html(html)) => Ok(PageSnapshot {
                url,
                html,
                user_agent: "FakeBrowser/1.0".to_string(),
            }),
            Some(PageOutcome::Hangs) => {
                tokio::time::sleep(settings.navigation_timeout).await;
                Err(Error::Navigation(format!(
                    "Timed out after {}s loading {}",
                    settings.navigation_timeout.as_secs(),
                    url
                )))
            }
            Some(PageOutcome::Crashes) => {
                self.alive.store(false, Ordering::SeqCst);
                Err(Error::Navigation(format!("browser crashed loading {}", url)))
            }
            Some(PageOutcome::NavigationFails) | None => {
                Err(Error::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
