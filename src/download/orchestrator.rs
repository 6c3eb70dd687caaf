//! Drives each request from a pooled browser to a file on disk.
//!
//! The primary path renders the post in a pooled browser, picks the first
//! media candidate and streams it to disk. Any failure along the way turns
//! into substitute content from the [`FallbackProvider`]; only a failed
//! substitute reaches the caller as an error.

use std::path::{Path, PathBuf};

use crate::browser::{BrowserLauncher, BrowserPool, BrowserSession, NavigationSettings};
use crate::config::Config;
use crate::download::fallback::FallbackProvider;
use crate::download::fetcher::AssetFetcher;
use crate::download::state::{Stage, StageTracker};
use crate::error::{Error, Result};
use crate::media::{extract_media, DownloadManifest, DownloadRequest, StoredFile};

/// Runs download requests against a shared browser pool.
pub struct Downloader<L: BrowserLauncher> {
    pool: BrowserPool<L>,
    fetcher: AssetFetcher,
    fallback: FallbackProvider,
    settings: NavigationSettings,
    dest_dir: PathBuf,
    served_prefix: String,
}

impl<L: BrowserLauncher> Clone for Downloader<L> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            fetcher: self.fetcher.clone(),
            fallback: self.fallback.clone(),
            settings: self.settings.clone(),
            dest_dir: self.dest_dir.clone(),
            served_prefix: self.served_prefix.clone(),
        }
    }
}

impl<L: BrowserLauncher> Downloader<L> {
    pub fn new(launcher: L, config: &Config) -> Result<Self> {
        let fetcher = AssetFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(launcher, config, fetcher))
    }

    /// Build with a specific fetcher, shared by the primary and substitute paths.
    pub fn with_fetcher(launcher: L, config: &Config, fetcher: AssetFetcher) -> Self {
        let served_prefix = config.storage.served_prefix.clone();
        Self {
            pool: BrowserPool::new(launcher, config.browser.pool_size),
            fallback: FallbackProvider::new(fetcher.clone(), &config.fallback, &served_prefix),
            fetcher,
            settings: NavigationSettings::from(&config.browser),
            dest_dir: config.download_directory(),
            served_prefix,
        }
    }

    pub fn pool(&self) -> &BrowserPool<L> {
        &self.pool
    }

    pub fn destination(&self) -> &Path {
        &self.dest_dir
    }

    /// Download the media behind one post.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadManifest> {
        self.download_traced(request).await.0
    }

    /// Like [`Downloader::download`], also returning the stages the request went through.
    pub async fn download_traced(
        &self,
        request: &DownloadRequest,
    ) -> (Result<DownloadManifest>, Vec<Stage>) {
        let mut tracker = StageTracker::new(request.url());
        tracing::info!(
            "Downloading {} ({} {})",
            request.url(),
            request.platform(),
            request.content_type()
        );

        let result = match self.primary(request, &mut tracker).await {
            Ok(stored) => {
                tracker.advance(Stage::Ready);
                Ok(DownloadManifest::from_stored(&stored, &self.served_prefix, None))
            }
            Err(e) => {
                tracker.advance(Stage::FallingBack);
                let reason = e.to_string();
                match self.fallback.provide(request, &reason, &self.dest_dir).await {
                    Ok(manifest) => {
                        tracker.advance(Stage::Ready);
                        Ok(manifest)
                    }
                    Err(e) => {
                        tracker.advance(Stage::Failed);
                        tracing::error!("{}: {}", request.url(), e);
                        Err(e)
                    }
                }
            }
        };

        (result, tracker.into_history())
    }

    /// Browser, extraction and fetch. The browser goes back to the pool as
    /// soon as the page DOM has been read.
    async fn primary(
        &self,
        request: &DownloadRequest,
        tracker: &mut StageTracker,
    ) -> Result<StoredFile> {
        tracker.advance(Stage::Acquiring);
        let lease = self.pool.lease().await?;

        tracker.advance(Stage::Navigating);
        let browser = lease
            .browser()
            .ok_or_else(|| Error::PoolInvariant("lease holds no browser".to_string()))?;
        let snapshot = browser.snapshot(request, &self.settings).await?;

        tracker.advance(Stage::Extracting);
        let candidates = extract_media(&snapshot.html, request.platform(), request.content_type());
        // a failed return is only logged, the fetch still goes ahead
        if let Err(e) = lease.release() {
            tracing::error!("Returning browser after {} failed: {}", request.url(), e);
        }

        let Some(candidate) = candidates.into_iter().next() else {
            return Err(Error::ExtractionEmpty);
        };
        tracing::debug!("Fetching {} {}", candidate.kind, candidate.source_url);

        tracker.advance(Stage::Fetching);
        self.fetcher
            .fetch(&candidate, request, &snapshot.user_agent, &self.dest_dir)
            .await
    }

    /// Download several posts concurrently. Results keep the input order.
    pub async fn download_all(
        &self,
        requests: Vec<DownloadRequest>,
    ) -> Vec<Result<DownloadManifest>> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let downloader = self.clone();
                tokio::spawn(async move { downloader.download(&request).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Fetch(format!("Download task aborted: {}", e))),
            });
        }
        results
    }

    /// Close every pooled browser. Later downloads get substitute content only.
    pub async fn shutdown(&self) {
        self.pool.drain_and_close_all().await;
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{ContentType, Platform};
    use crate::media::MediaKind;
    use crate::test_support::{FakeLauncher, PageOutcome};

    const CDN_HOST: &str = "scontent-lhr8-1.cdninstagram.com";

    struct Harness {
        downloader: Downloader<FakeLauncher>,
        launcher: FakeLauncher,
        server: MockServer,
        dir: TempDir,
    }

    impl Harness {
        async fn new(pool_size: usize) -> Self {
            let server = MockServer::start().await;
            let dir = TempDir::new().unwrap();

            let mut config = Config::default();
            config.browser.pool_size = pool_size;
            config.browser.navigation_timeout_secs = 1;
            config.browser.content_timeout_secs = 1;
            config.storage.download_directory = Some(dir.path().to_path_buf());
            config.fallback.image_url = format!("{}/fallback.jpg", server.uri());
            config.fallback.video_url = format!("{}/fallback.mp4", server.uri());

            // CDN hostnames resolve to the mock server
            let addr: SocketAddr = *server.address();
            let client = reqwest::Client::builder()
                .resolve(CDN_HOST, addr)
                .build()
                .unwrap();
            let fetcher = AssetFetcher::with_client(client, &config.fetch);

            let launcher = FakeLauncher::default();
            let downloader = Downloader::with_fetcher(launcher.clone(), &config, fetcher);

            Self {
                downloader,
                launcher,
                server,
                dir,
            }
        }

        fn cdn_url(&self, file: &str) -> String {
            format!(
                "http://{}:{}/v/t51.29350-15/{}?stp=dst-jpg&_nc_sig=abc",
                CDN_HOST,
                self.server.address().port(),
                file
            )
        }

        async fn serve_fallbacks(&self, status: u16) {
            for (route, mime) in [("/fallback.jpg", "image/jpeg"), ("/fallback.mp4", "video/mp4")] {
                Mock::given(method("GET"))
                    .and(path(route))
                    .respond_with(
                        ResponseTemplate::new(status)
                            .insert_header("Content-Type", mime)
                            .set_body_bytes(vec![9u8; 512]),
                    )
                    .mount(&self.server)
                    .await;
            }
        }

        fn files(&self) -> usize {
            std::fs::read_dir(self.dir.path()).map(|d| d.count()).unwrap_or(0)
        }
    }

    fn post(id: &str) -> DownloadRequest {
        DownloadRequest::new(
            &format!("https://www.instagram.com/p/{}/", id),
            Platform::Instagram,
            ContentType::Post,
        )
        .unwrap()
    }

    async fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let polled = tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(polled.is_ok(), "timed out waiting for {}", what);
    }

    #[tokio::test]
    async fn test_primary_image_download() {
        let h = Harness::new(1).await;
        let request = post("Cabc123");
        h.launcher.state.set_page(
            request.url(),
            PageOutcome::Html(format!(
                r#"<html><body><article><img src="{}" width="1080" height="1080"></article></body></html>"#,
                h.cdn_url("4321_n.jpg")
            )),
        );
        Mock::given(method("GET"))
            .and(path("/v/t51.29350-15/4321_n.jpg"))
            .and(header("Referer", "https://www.instagram.com/"))
            .and(header("User-Agent", "FakeBrowser/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .set_body_bytes(vec![1u8; 3000]),
            )
            .mount(&h.server)
            .await;

        let (result, stages) = h.downloader.download_traced(&request).await;
        let manifest = result.unwrap();

        assert!(manifest.success);
        assert_eq!(manifest.content_kind, MediaKind::Image);
        assert_eq!(manifest.note, None);
        assert_eq!(manifest.size_bytes, 3000);
        assert_eq!(manifest.thumbnail_url.as_deref(), Some(manifest.served_url.as_str()));
        assert!(manifest.local_filename.starts_with("instagram_post_"));
        assert!(manifest.served_url.starts_with("/downloads/instagram_post_"));

        let on_disk = std::fs::metadata(h.dir.path().join(&manifest.local_filename)).unwrap();
        assert_eq!(on_disk.len(), manifest.size_bytes);

        assert_eq!(
            stages,
            vec![
                Stage::Queued,
                Stage::Acquiring,
                Stage::Navigating,
                Stage::Extracting,
                Stage::Fetching,
                Stage::Ready,
            ]
        );

        let status = h.downloader.pool().status();
        assert_eq!(status.checked_out, 0);
        assert_eq!(status.idle, 1);
    }

    #[tokio::test]
    async fn test_navigation_timeout_serves_substitute() {
        let h = Harness::new(1).await;
        h.serve_fallbacks(200).await;
        let request = post("Ctimeout");
        h.launcher.state.set_page(request.url(), PageOutcome::Hangs);

        let (result, stages) = h.downloader.download_traced(&request).await;
        let manifest = result.unwrap();

        assert!(manifest.success);
        let note = manifest.note.as_deref().unwrap();
        assert!(note.starts_with("Substitute content served: "));
        assert!(note.contains("Navigation failed: Timed out"));
        assert_eq!(
            &stages[stages.len() - 3..],
            &[Stage::Navigating, Stage::FallingBack, Stage::Ready]
        );
        assert_eq!(h.downloader.pool().status().checked_out, 0);
        assert_eq!(h.files(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_and_failed_substitute_is_terminal() {
        let h = Harness::new(1).await;
        h.serve_fallbacks(500).await;
        let request = post("Cempty");
        h.launcher.state.set_page(
            request.url(),
            PageOutcome::Html("<html><body><p>Sorry, this page isn't available.</p></body></html>".into()),
        );

        let (result, stages) = h.downloader.download_traced(&request).await;
        let err = result.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("No media found on the page"), "{}", message);
        assert!(message.contains("HTTP 500"), "{}", message);
        assert!(matches!(err, Error::Fallback { .. }));
        assert_eq!(
            &stages[stages.len() - 3..],
            &[Stage::Extracting, Stage::FallingBack, Stage::Failed]
        );
        assert_eq!(h.files(), 0);
        assert_eq!(h.downloader.pool().status().checked_out, 0);
    }

    #[tokio::test]
    async fn test_cdn_error_falls_back_after_releasing_browser() {
        let h = Harness::new(1).await;
        h.serve_fallbacks(200).await;
        let request = post("Cgone");
        h.launcher.state.set_page(
            request.url(),
            PageOutcome::Html(format!(
                r#"<html><body><article><video src="{}"></video></article></body></html>"#,
                h.cdn_url("clip.mp4")
            )),
        );
        Mock::given(method("GET"))
            .and(path("/v/t51.29350-15/clip.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&h.server)
            .await;

        let (result, stages) = h.downloader.download_traced(&request).await;
        let manifest = result.unwrap();

        assert!(manifest.note.as_deref().unwrap().contains("HTTP 404"));
        assert!(stages.contains(&Stage::Fetching));
        assert_eq!(stages.last(), Some(&Stage::Ready));
        assert_eq!(h.files(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_falls_back() {
        let h = Harness::new(1).await;
        h.serve_fallbacks(200).await;
        h.launcher.state.fail_launches.store(1, Ordering::SeqCst);

        let (result, stages) = h.downloader.download_traced(&post("Cnochrome")).await;
        let manifest = result.unwrap();

        assert!(manifest.note.as_deref().unwrap().contains("Failed to start browser"));
        assert_eq!(
            stages,
            vec![Stage::Queued, Stage::Acquiring, Stage::FallingBack, Stage::Ready]
        );
        assert_eq!(h.downloader.pool().status().constructing, 0);
    }

    #[tokio::test]
    async fn test_crashed_browser_is_not_reused() {
        let h = Harness::new(1).await;
        h.serve_fallbacks(200).await;
        let request = post("Ccrash");
        h.launcher.state.set_page(request.url(), PageOutcome::Crashes);

        h.downloader.download(&request).await.unwrap();
        wait_until("crashed browser close", || {
            h.launcher.state.closes.load(Ordering::SeqCst) == 1
        })
        .await;
        assert_eq!(h.downloader.pool().status().idle, 0);

        h.downloader.download(&post("Cnext")).await.unwrap();
        assert_eq!(h.launcher.state.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_third_request_waits_and_beats_later_arrival() {
        let h = Harness::new(2).await;
        h.serve_fallbacks(200).await;
        let gate = h.launcher.state.gate_loads();
        let state = h.launcher.state.clone();

        let requests: Vec<_> = ["C1", "C2", "C3", "C4"].iter().map(|id| post(id)).collect();
        let spawn = |request: DownloadRequest| {
            let downloader = h.downloader.clone();
            tokio::spawn(async move { downloader.download(&request).await })
        };

        let first = spawn(requests[0].clone());
        let second = spawn(requests[1].clone());
        let third = spawn(requests[2].clone());

        wait_until("two navigations", || state.entered().len() == 2).await;
        wait_until("third request queued", || h.downloader.pool().status().waiting == 1).await;
        assert_eq!(state.entered().len(), 2);

        let fourth = spawn(requests[3].clone());
        wait_until("fourth request queued", || h.downloader.pool().status().waiting == 2).await;

        gate.add_permits(1);
        wait_until("third navigation", || state.entered().len() == 3).await;
        assert_eq!(state.entered()[2], requests[2].url());
        assert_eq!(h.downloader.pool().status().waiting, 1);

        gate.add_permits(1);
        wait_until("fourth navigation", || state.entered().len() == 4).await;
        assert_eq!(state.entered()[3], requests[3].url());

        gate.add_permits(2);
        for handle in [first, second, third, fourth] {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(state.max_active_loads.load(Ordering::SeqCst), 2);
        assert_eq!(state.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_download_all_keeps_input_order() {
        let h = Harness::new(2).await;
        h.serve_fallbacks(200).await;
        let image_request = post("Cimage");
        h.launcher.state.set_page(
            image_request.url(),
            PageOutcome::Html(format!(
                r#"<html><head><meta property="og:image" content="{}"></head><body></body></html>"#,
                h.cdn_url("og_n.jpg")
            )),
        );
        Mock::given(method("GET"))
            .and(path("/v/t51.29350-15/og_n.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 100]))
            .mount(&h.server)
            .await;

        let results = h
            .downloader
            .download_all(vec![post("Cmissing"), image_request, post("Cother")])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().is_substitute());
        assert!(!results[1].as_ref().unwrap().is_substitute());
        assert_eq!(results[1].as_ref().unwrap().size_bytes, 100);
        assert!(results[2].as_ref().unwrap().is_substitute());
    }

    #[tokio::test]
    async fn test_shutdown_closes_pooled_browsers() {
        let h = Harness::new(2).await;
        h.serve_fallbacks(200).await;
        h.downloader.download(&post("Cwarm")).await.unwrap();
        assert_eq!(h.downloader.pool().status().idle, 1);

        h.downloader.shutdown().await;
        assert_eq!(h.launcher.state.closes.load(Ordering::SeqCst), 1);

        // the pool is gone, substitute content still works
        let (result, stages) = h.downloader.download_traced(&post("Clate")).await;
        assert!(result.unwrap().note.unwrap().contains("shut down"));
        assert_eq!(stages[2], Stage::FallingBack);
    }
}
