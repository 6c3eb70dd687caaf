//! Media candidate representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of media content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Extension used when neither the URL nor the response says otherwise.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    /// Classify a MIME type, if it is one we store.
    pub fn from_mimetype(mimetype: &str) -> Option<Self> {
        let mimetype = mimetype.trim().to_lowercase();
        if mimetype.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mimetype.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A media reference found on a page, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    /// URL as found in the page, query string included (CDNs sign it).
    pub source_url: String,

    /// Image or video.
    pub kind: MediaKind,

    /// Scheme, host and path only. Two candidates with the same key are the same asset.
    pub normalized_url: String,
}

impl MediaCandidate {
    pub fn new(source_url: String, kind: MediaKind, normalized_url: String) -> Self {
        Self {
            source_url,
            kind,
            normalized_url,
        }
    }
}
