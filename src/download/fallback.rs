//! Substitute content for requests whose real media could not be fetched.

use std::path::Path;

use rand::Rng;

use crate::browser::random_user_agent;
use crate::config::{ContentType, FallbackConfig};
use crate::download::fetcher::AssetFetcher;
use crate::error::{Error, Result};
use crate::media::{DownloadManifest, DownloadRequest, MediaCandidate, MediaKind};

/// Serves a fixed stand-in asset when the primary pipeline fails.
#[derive(Debug, Clone)]
pub struct FallbackProvider {
    fetcher: AssetFetcher,
    image_url: String,
    video_url: String,
    served_prefix: String,
}

impl FallbackProvider {
    pub fn new(fetcher: AssetFetcher, config: &FallbackConfig, served_prefix: &str) -> Self {
        Self {
            fetcher,
            image_url: config.image_url.clone(),
            video_url: config.video_url.clone(),
            served_prefix: served_prefix.to_string(),
        }
    }

    /// Download substitute content for `request` into `dest_dir`.
    ///
    /// `reason` is the primary failure; it ends up in the manifest note. If
    /// the substitute cannot be fetched either, both messages are returned in
    /// an [`Error::Fallback`] and the request is finished.
    pub async fn provide(
        &self,
        request: &DownloadRequest,
        reason: &str,
        dest_dir: &Path,
    ) -> Result<DownloadManifest> {
        let kind = substitute_kind(request.content_type(), &mut rand::thread_rng());
        let url = match kind {
            MediaKind::Image => &self.image_url,
            MediaKind::Video => &self.video_url,
        };

        tracing::warn!(
            "Serving substitute {} for {}: {}",
            kind,
            request.url(),
            reason
        );

        let candidate = MediaCandidate::new(url.clone(), kind, url.clone());
        let stored = self
            .fetcher
            .fetch(&candidate, request, random_user_agent(), dest_dir)
            .await
            .map_err(|e| Error::Fallback {
                original: reason.to_string(),
                fallback: e.to_string(),
            })?;

        Ok(DownloadManifest::from_stored(
            &stored,
            &self.served_prefix,
            Some(format!("Substitute content served: {}", reason)),
        ))
    }
}

/// Which kind of stand-in suits a content type.
///
/// Highlights get an image and reels a video. Posts and stories can be
/// either, so one is picked at random.
pub fn substitute_kind<R: Rng + ?Sized>(content_type: ContentType, rng: &mut R) -> MediaKind {
    match content_type {
        ContentType::Highlight => MediaKind::Image,
        ContentType::Reel => MediaKind::Video,
        ContentType::Post | ContentType::Story => {
            if rng.gen_bool(0.5) {
                MediaKind::Image
            } else {
                MediaKind::Video
            }
        }
    }
}
