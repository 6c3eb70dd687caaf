//! Filename generation and manipulation.

use url::Url;
use uuid::Uuid;

use crate::config::{ContentType, Platform};
use crate::error::{Error, Result};
use crate::media::MediaKind;

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Collision-free name for a downloaded asset: `<platform>_<contentType>_<uuid>.<ext>`.
pub fn unique_media_filename(
    platform: Platform,
    content_type: ContentType,
    extension: &str,
) -> Result<String> {
    let name = format!(
        "{}_{}_{}.{}",
        platform,
        content_type,
        Uuid::new_v4().simple(),
        extension
    );
    sanitize_filename(&name)
}

/// Pick a file extension: URL path first, then Content-Type, then the kind's default.
pub fn choose_extension(url: &str, content_type: Option<&str>, kind: MediaKind) -> String {
    if let Some(ext) = extract_extension_from_url(url) {
        return ext;
    }

    content_type
        .and_then(mime_to_extension)
        .unwrap_or_else(|| kind.default_extension().to_string())
}

/// Extract extension from URL path.
fn extract_extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let filename = parsed.path_segments()?.next_back()?;
    let (_, ext) = filename.rsplit_once('.')?;

    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_lowercase())
    } else {
        None
    }
}

/// Convert a Content-Type header value to a file extension.
fn mime_to_extension(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_lowercase();

    // mime_guess lists "jpe" before "jpg"; prefer the common spellings
    match mime.as_str() {
        "image/jpeg" => return Some("jpg".to_string()),
        "video/mp4" => return Some("mp4".to_string()),
        "video/quicktime" => return Some("mov".to_string()),
        _ => {}
    }

    mime_guess::get_mime_extensions_str(&mime)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}
