//! Platform and content type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported source platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
}

impl Platform {
    /// Referer sent with asset requests, matching the page the asset came from.
    pub fn referer(&self) -> &'static str {
        match self {
            Platform::Instagram => "https://www.instagram.com/",
            Platform::Facebook => "https://www.facebook.com/",
        }
    }

    /// Content-delivery domains whose assets count as post media.
    pub fn cdn_domains(&self) -> &'static [&'static str] {
        match self {
            Platform::Instagram => &["cdninstagram.com", "fbcdn.net"],
            Platform::Facebook => &["fbcdn.net"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Instagram => write!(f, "instagram"),
            Platform::Facebook => write!(f, "facebook"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" | "ig" => Ok(Platform::Instagram),
            "facebook" | "fb" => Ok(Platform::Facebook),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// Kind of post the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Post,
    Story,
    Reel,
    Highlight,
}

impl ContentType {
    /// Whether the content is usually a video, used to order selector rules.
    pub fn prefers_video(&self) -> bool {
        matches!(self, ContentType::Reel | ContentType::Story)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Post => write!(f, "post"),
            ContentType::Story => write!(f, "story"),
            ContentType::Reel => write!(f, "reel"),
            ContentType::Highlight => write!(f, "highlight"),
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(ContentType::Post),
            "story" | "stories" => Ok(ContentType::Story),
            "reel" | "reels" => Ok(ContentType::Reel),
            "highlight" | "highlights" => Ok(ContentType::Highlight),
            _ => Err(format!("Unknown content type: {}", s)),
        }
    }
}
