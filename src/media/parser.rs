//! Media extraction from a rendered page.
//!
//! Works on an HTML snapshot of the page so the heuristics can be tested
//! against fixture markup without a browser.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::{ContentType, Platform};
use crate::media::item::{MediaCandidate, MediaKind};
use crate::media::selectors::{rules_for, SelectorRule};

/// Images declaring a side smaller than this are icons, avatars or thumbnails.
pub const MIN_DIMENSION: u32 = 150;

/// Collect the post media from a page snapshot.
///
/// Candidates come back in rule order (see [`rules_for`]), and in document
/// order within a single rule. Duplicates are dropped by URL without its
/// query string, keeping the first one seen. An empty result means nothing
/// usable was found.
pub fn extract_media(
    html: &str,
    platform: Platform,
    content_type: ContentType,
) -> Vec<MediaCandidate> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for rule in rules_for(platform, content_type) {
        let selector = match Selector::parse(rule.css) {
            Ok(sel) => sel,
            Err(e) => {
                tracing::warn!("Skipping unparsable selector {:?}: {:?}", rule.css, e);
                continue;
            }
        };

        for element in document.select(&selector) {
            let Some(raw) = resolve_source(&element, &rule) else {
                continue;
            };
            let Some((source_url, normalized)) = accept_url(&raw, platform) else {
                tracing::trace!("Rejected off-CDN url {}", raw);
                continue;
            };
            if is_too_small(&element) {
                tracing::trace!("Rejected undersized image {}", source_url);
                continue;
            }
            if !seen.insert(normalized.clone()) {
                continue;
            }

            let kind = classify(&element);
            tracing::debug!("Candidate {} ({}) via {:?}", normalized, kind, rule.css);
            candidates.push(MediaCandidate::new(source_url, kind, normalized));
        }
    }

    candidates
}

/// Read the media URL from an element: primary attribute, then fallback.
fn resolve_source(element: &ElementRef<'_>, rule: &SelectorRule) -> Option<String> {
    let value = element.value();

    let primary = value
        .attr(rule.primary_attr)
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(v) = primary {
        return Some(v.to_string());
    }

    let attr = rule.fallback_attr?;
    let fallback = value.attr(attr).map(str::trim).filter(|v| !v.is_empty())?;
    if attr == "srcset" {
        widest_srcset_entry(fallback)
    } else {
        Some(fallback.to_string())
    }
}

/// Pick the URL with the largest width descriptor from a `srcset` value.
fn widest_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let width = parts
                .next()
                .and_then(|d| d.strip_suffix('w'))
                .and_then(|w| w.parse::<u32>().ok())
                .unwrap_or(0);
            Some((width, url))
        })
        .max_by_key(|(width, _)| *width)
        .map(|(_, url)| url.to_string())
}

/// Check the URL against the platform's CDN hosts.
///
/// Returns the absolute URL and its query-less dedup key.
fn accept_url(raw: &str, platform: Platform) -> Option<(String, String)> {
    let absolute = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw.to_string()
    };

    let url = Url::parse(&absolute).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?.to_lowercase();
    if !is_cdn_host(&host, platform) {
        return None;
    }

    let mut normalized = url.clone();
    normalized.set_query(None);
    normalized.set_fragment(None);

    Some((url.to_string(), normalized.to_string()))
}

fn is_cdn_host(host: &str, platform: Platform) -> bool {
    platform
        .cdn_domains()
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

/// Attributes the navigator stamps with each image's rendered box.
pub const RENDERED_WIDTH_ATTR: &str = "data-rendered-width";
pub const RENDERED_HEIGHT_ATTR: &str = "data-rendered-height";

/// Whether an image is smaller than [`MIN_DIMENSION`] on either side.
///
/// The rendered size stamped by the navigator wins, then the `width` and
/// `height` attributes, then inline `style` lengths in px. Elements with
/// no known size pass.
fn is_too_small(element: &ElementRef<'_>) -> bool {
    if element.value().name() != "img" {
        return false;
    }

    [
        (RENDERED_WIDTH_ATTR, "width"),
        (RENDERED_HEIGHT_ATTR, "height"),
    ]
    .iter()
    .filter_map(|(rendered, plain)| declared_size(element, rendered, plain))
    .any(|v| v < MIN_DIMENSION as f32)
}

fn declared_size(element: &ElementRef<'_>, rendered: &str, plain: &str) -> Option<f32> {
    let value = element.value();

    // an unlaid-out image reports 0x0, which says nothing about its size
    let stamped = value
        .attr(rendered)
        .and_then(parse_px)
        .filter(|v| *v > 0.0);

    stamped
        .or_else(|| value.attr(plain).and_then(parse_px))
        .or_else(|| value.attr("style").and_then(|style| style_length(style, plain)))
}

/// Read a px length for `property` out of an inline style declaration.
fn style_length(style: &str, property: &str) -> Option<f32> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case(property) {
            return None;
        }
        let value = value.trim().trim_end_matches("!important").trim();
        value.strip_suffix("px").and_then(parse_px)
    })
}

fn parse_px(value: &str) -> Option<f32> {
    value.trim().trim_end_matches("px").trim().parse::<f32>().ok()
}

/// Image or video, judged by the tag or the `og:` property.
fn classify(element: &ElementRef<'_>) -> MediaKind {
    let value = element.value();
    match value.name() {
        "video" => MediaKind::Video,
        "source" => {
            let in_video = element
                .parent()
                .and_then(ElementRef::wrap)
                .map(|p| p.value().name() == "video")
                .unwrap_or(false);
            let typed_video = value
                .attr("type")
                .and_then(MediaKind::from_mimetype)
                .map(|k| k == MediaKind::Video)
                .unwrap_or(false);
            if in_video || typed_video {
                MediaKind::Video
            } else {
                MediaKind::Image
            }
        }
        "meta" => {
            let property = value.attr("property").unwrap_or_default();
            if property.contains("video") {
                MediaKind::Video
            } else {
                MediaKind::Image
            }
        }
        _ => MediaKind::Image,
    }
}
