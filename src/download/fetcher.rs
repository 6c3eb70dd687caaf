//! Streamed download of a media asset to local storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::fs::{choose_extension, destination_path, ensure_dir, remove_partial, unique_media_filename};
use crate::media::{DownloadRequest, MediaCandidate, StoredFile};

/// Downloads one remote asset per call into a destination directory.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl AssetFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(client: Client, config: &FetchConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            max_bytes: config.max_bytes,
        }
    }

    /// Stream `candidate` into `dest_dir` under a fresh unique name.
    ///
    /// The request presents `user_agent` and the source platform as referer.
    /// On any failure, including the overall timeout, the partially written
    /// file is removed before the error is returned.
    pub async fn fetch(
        &self,
        candidate: &MediaCandidate,
        request: &DownloadRequest,
        user_agent: &str,
        dest_dir: &Path,
    ) -> Result<StoredFile> {
        let mut partial: Option<PathBuf> = None;

        let outcome = timeout(
            self.timeout,
            self.stream_to_disk(candidate, request, user_agent, dest_dir, &mut partial),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Fetch(format!(
                "Timed out after {}s fetching {}",
                self.timeout.as_secs(),
                candidate.source_url
            ))),
        };

        if result.is_err() {
            if let Some(path) = partial {
                tracing::debug!("Removing partial file {}", path.display());
                remove_partial(&path).await;
            }
        }

        result
    }

    async fn stream_to_disk(
        &self,
        candidate: &MediaCandidate,
        request: &DownloadRequest,
        user_agent: &str,
        dest_dir: &Path,
        partial: &mut Option<PathBuf>,
    ) -> Result<StoredFile> {
        let url = candidate.source_url.as_str();

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(REFERER, request.platform().referer())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {} from {}", status.as_u16(), url)));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(Error::Fetch(format!(
                    "{} is {} bytes, limit is {}",
                    url, length, self.max_bytes
                )));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let extension = choose_extension(url, content_type.as_deref(), candidate.kind);
        let filename = unique_media_filename(request.platform(), request.content_type(), &extension)?;

        ensure_dir(dest_dir).await?;
        let path = destination_path(dest_dir, &filename)?;

        let mut file = File::create(&path).await?;
        *partial = Some(path.clone());

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(format!("Stream error: {}", e)))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(Error::Fetch(format!(
                    "{} exceeded the {} byte limit",
                    url, self.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let on_disk = tokio::fs::metadata(&path).await?.len();
        if on_disk != written {
            return Err(Error::Fetch(format!(
                "Wrote {} bytes but {} are on disk for {}",
                written, on_disk, filename
            )));
        }

        tracing::info!("Saved {} ({} bytes)", filename, written);

        Ok(StoredFile {
            path,
            filename,
            size_bytes: written,
            kind: candidate.kind,
        })
    }
}
