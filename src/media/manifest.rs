//! Results handed back to the caller.

use std::path::PathBuf;

use serde::Serialize;

use crate::fs::size::format_size;
use crate::media::item::MediaKind;

/// A file fully written to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    pub kind: MediaKind,
}

/// Description of a completed download, primary or substitute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadManifest {
    pub success: bool,
    pub local_filename: String,
    pub served_url: String,
    pub content_kind: MediaKind,
    pub size_label: String,
    pub size_bytes: u64,
    pub thumbnail_url: Option<String>,
    /// Set when the file is substitute content; says why the real media was not served.
    pub note: Option<String>,
}

impl DownloadManifest {
    /// Build the manifest for a stored file served under `served_prefix`.
    pub fn from_stored(file: &StoredFile, served_prefix: &str, note: Option<String>) -> Self {
        let served_url = format!(
            "{}/{}",
            served_prefix.trim_end_matches('/'),
            file.filename
        );
        let thumbnail_url = match file.kind {
            MediaKind::Image => Some(served_url.clone()),
            MediaKind::Video => None,
        };

        Self {
            success: true,
            local_filename: file.filename.clone(),
            served_url,
            content_kind: file.kind,
            size_label: format_size(file.size_bytes),
            size_bytes: file.size_bytes,
            thumbnail_url,
            note,
        }
    }

    /// Whether this manifest describes substitute content.
    pub fn is_substitute(&self) -> bool {
        self.note.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(kind: MediaKind) -> StoredFile {
        StoredFile {
            path: PathBuf::from("/tmp/instagram_post_abc.jpg"),
            filename: "instagram_post_abc.jpg".into(),
            size_bytes: 1536,
            kind,
        }
    }

    #[test]
    fn test_image_manifest_has_thumbnail() {
        let manifest = DownloadManifest::from_stored(&stored(MediaKind::Image), "/downloads/", None);
        assert!(manifest.success);
        assert_eq!(manifest.served_url, "/downloads/instagram_post_abc.jpg");
        assert_eq!(manifest.thumbnail_url.as_deref(), Some("/downloads/instagram_post_abc.jpg"));
        assert_eq!(manifest.size_label, "1.50 KB");
        assert!(!manifest.is_substitute());
    }

    #[test]
    fn test_video_manifest_serializes_camel_case() {
        let manifest = DownloadManifest::from_stored(
            &stored(MediaKind::Video),
            "/downloads",
            Some("Substitute content served: timeout".into()),
        );
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["contentKind"], "video");
        assert_eq!(json["localFilename"], "instagram_post_abc.jpg");
        assert!(json["thumbnailUrl"].is_null());
        assert_eq!(json["note"], "Substitute content served: timeout");
    }
}
