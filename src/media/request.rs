//! Download request representation.

use crate::config::validation::parse_post_url;
use crate::config::{ContentType, Platform};
use crate::error::{Error, Result};

/// A user's request for the media behind one post. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    platform: Platform,
    content_type: ContentType,
}

impl DownloadRequest {
    /// Build a request with an explicit platform and content type.
    ///
    /// The URL must still belong to the stated platform.
    pub fn new(url: &str, platform: Platform, content_type: ContentType) -> Result<Self> {
        let (parsed, detected, _) = parse_post_url(url)?;
        if detected != platform {
            return Err(Error::InvalidUrl(format!(
                "{} is not a {} URL",
                url, platform
            )));
        }

        Ok(Self {
            url: parsed.to_string(),
            platform,
            content_type,
        })
    }

    /// Build a request, inferring platform and content type from the URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let (parsed, platform, content_type) = parse_post_url(url)?;
        Ok(Self {
            url: parsed.to_string(),
            platform,
            content_type,
        })
    }

    /// Same request with a different content type.
    pub fn with_content_type(&self, content_type: ContentType) -> Self {
        Self {
            content_type,
            ..self.clone()
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}
