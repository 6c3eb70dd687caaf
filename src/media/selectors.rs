//! Per-platform selector allowlist.
//!
//! These patterns track the markup Instagram and Facebook serve today and
//! will need updating when it changes.

use crate::config::{ContentType, Platform};
use crate::media::item::MediaKind;

/// One way of finding post media in a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorRule {
    /// CSS selector matched against the rendered DOM.
    pub css: &'static str,

    /// Kind of media this rule is aimed at; used for ordering only.
    pub kind: MediaKind,

    /// Attribute holding the media URL.
    pub primary_attr: &'static str,

    /// Attribute tried when the primary one is missing or empty.
    pub fallback_attr: Option<&'static str>,
}

const fn rule(
    css: &'static str,
    kind: MediaKind,
    primary_attr: &'static str,
    fallback_attr: Option<&'static str>,
) -> SelectorRule {
    SelectorRule {
        css,
        kind,
        primary_attr,
        fallback_attr,
    }
}

const INSTAGRAM_RULES: &[SelectorRule] = &[
    rule(
        "article video, main video, section video",
        MediaKind::Video,
        "src",
        Some("data-src"),
    ),
    rule("video > source", MediaKind::Video, "src", None),
    rule(
        "article img, main img[srcset], section img[srcset]",
        MediaKind::Image,
        "src",
        Some("srcset"),
    ),
    rule(
        r#"img[style*="object-fit"]"#,
        MediaKind::Image,
        "src",
        Some("srcset"),
    ),
    rule(
        r#"meta[property="og:video"], meta[property="og:video:secure_url"]"#,
        MediaKind::Video,
        "content",
        None,
    ),
    rule(
        r#"meta[property="og:image"]"#,
        MediaKind::Image,
        "content",
        None,
    ),
];

const FACEBOOK_RULES: &[SelectorRule] = &[
    rule(
        r#"div[role="article"] video, div[role="main"] video, video"#,
        MediaKind::Video,
        "src",
        Some("data-src"),
    ),
    rule(
        r#"img[data-visualcompletion="media-vc-image"]"#,
        MediaKind::Image,
        "src",
        Some("data-src"),
    ),
    rule(
        r#"div[role="article"] img, div[role="main"] img"#,
        MediaKind::Image,
        "src",
        Some("srcset"),
    ),
    rule(
        r#"meta[property="og:video"], meta[property="og:video:url"], meta[property="og:video:secure_url"]"#,
        MediaKind::Video,
        "content",
        None,
    ),
    rule(
        r#"meta[property="og:image"]"#,
        MediaKind::Image,
        "content",
        None,
    ),
];

/// Rules for a platform, in the order they should be applied.
///
/// Content types that are usually videos get their video rules first. This is a
/// hint, not a guarantee: a reel URL that actually holds a photo still yields the photo.
pub fn rules_for(platform: Platform, content_type: ContentType) -> Vec<SelectorRule> {
    let table = match platform {
        Platform::Instagram => INSTAGRAM_RULES,
        Platform::Facebook => FACEBOOK_RULES,
    };

    let mut rules = table.to_vec();
    if content_type.prefers_video() {
        // stable: relative order inside each group is kept
        rules.sort_by_key(|r| r.kind != MediaKind::Video);
    }
    rules
}

/// Selector whose presence means the post body has rendered.
pub fn content_marker(platform: Platform, content_type: ContentType) -> &'static str {
    match (platform, content_type) {
        (Platform::Instagram, ContentType::Story | ContentType::Highlight) => "section video, section img",
        (Platform::Instagram, _) => "article, main[role=\"main\"]",
        (Platform::Facebook, _) => "div[role=\"main\"], div[role=\"article\"]",
    }
}

/// Selector of the close button on the login/consent overlay.
pub fn overlay_dismiss(platform: Platform) -> &'static str {
    match platform {
        Platform::Instagram => {
            r#"div[role="dialog"] svg[aria-label="Close"], div[role="dialog"] button[aria-label="Close"], button._a9--._a9_1"#
        }
        Platform::Facebook => {
            r#"div[role="dialog"] div[aria-label="Close"], div[aria-label="Close"][role="button"]"#
        }
    }
}
