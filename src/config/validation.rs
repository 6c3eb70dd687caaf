//! Configuration validation and post URL recognition.

use crate::config::loader::Config;
use crate::config::modes::{ContentType, Platform};
use crate::error::{Error, Result};
use url::Url;

/// Largest pool accepted; each entry is a full browser process.
const MAX_POOL_SIZE: usize = 16;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_pool_size(config.browser.pool_size)?;
    validate_timeouts(config)?;
    validate_http_url("fallback.image_url", &config.fallback.image_url)?;
    validate_http_url("fallback.video_url", &config.fallback.video_url)?;

    if config.fetch.max_bytes == 0 {
        return Err(Error::ConfigValidation {
            field: "fetch.max_bytes".to_string(),
            message: "Must be greater than zero".to_string(),
        });
    }

    Ok(())
}

/// Validate the browser pool capacity.
pub fn validate_pool_size(size: usize) -> Result<()> {
    if size == 0 || size > MAX_POOL_SIZE {
        return Err(Error::ConfigValidation {
            field: "browser.pool_size".to_string(),
            message: format!("Must be between 1 and {} (got {})", MAX_POOL_SIZE, size),
        });
    }
    Ok(())
}

fn validate_timeouts(config: &Config) -> Result<()> {
    let checks = [
        (
            "browser.navigation_timeout_secs",
            config.browser.navigation_timeout_secs,
        ),
        (
            "browser.content_timeout_secs",
            config.browser.content_timeout_secs,
        ),
        (
            "browser.overlay_timeout_secs",
            config.browser.overlay_timeout_secs,
        ),
        ("fetch.timeout_secs", config.fetch.timeout_secs),
    ];

    for (field, value) in checks {
        if value == 0 {
            return Err(Error::ConfigValidation {
                field: field.to_string(),
                message: "Timeout must be at least one second".to_string(),
            });
        }
    }

    if config.browser.content_timeout_secs > config.browser.navigation_timeout_secs {
        return Err(Error::ConfigValidation {
            field: "browser.content_timeout_secs".to_string(),
            message: format!(
                "Content wait ({}s) must not exceed the navigation timeout ({}s)",
                config.browser.content_timeout_secs, config.browser.navigation_timeout_secs
            ),
        });
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(Error::ConfigValidation {
            field: field.to_string(),
            message: format!("'{}' is not an http(s) URL", value),
        }),
    }
}

/// Recognize a public post URL and infer its platform and content type.
pub fn parse_post_url(input: &str) -> Result<(Url, Platform, ContentType)> {
    let input = input.trim();
    let url = Url::parse(input).map_err(|_| Error::InvalidUrl(input.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(input.to_string()));
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidUrl(input.to_string()))?
        .to_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host)
        .to_string();

    let segments: Vec<String> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_lowercase).collect())
        .unwrap_or_default();
    let has = |name: &str| segments.iter().any(|s| s == name);

    let (platform, content_type) = match host.as_str() {
        "instagram.com" => {
            let content_type = if has("stories") && has("highlights") {
                ContentType::Highlight
            } else if has("stories") {
                ContentType::Story
            } else if has("reel") || has("reels") || has("tv") {
                ContentType::Reel
            } else {
                ContentType::Post
            };
            (Platform::Instagram, content_type)
        }
        "facebook.com" | "fb.com" => {
            let content_type = if has("stories") {
                ContentType::Story
            } else if has("reel") || has("videos") || has("watch") {
                ContentType::Reel
            } else {
                ContentType::Post
            };
            (Platform::Facebook, content_type)
        }
        "fb.watch" => (Platform::Facebook, ContentType::Reel),
        other => return Err(Error::UnsupportedPlatform(other.to_string())),
    };

    if segments.is_empty() && host != "fb.watch" {
        return Err(Error::InvalidUrl(format!(
            "{} does not point at a post",
            input
        )));
    }

    Ok((url, platform, content_type))
}
