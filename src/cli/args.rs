//! Command-line argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, ContentType};

/// Social media post media downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "postgrab",
    version,
    about = "Download the photo or video behind Instagram and Facebook posts",
    long_about = "Renders each post in a pooled headless browser, finds its media and saves it locally.\n\n\
                  When the real media cannot be retrieved, substitute content is saved instead and marked as such."
)]
pub struct Args {
    /// Post, reel, story or highlight URL(s).
    #[arg(required_unless_present = "init_config", num_args = 1..)]
    pub urls: Vec<String>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "postgrab.toml")]
    pub config: PathBuf,

    /// Write a configuration file with default values and exit.
    #[arg(long)]
    pub init_config: bool,

    /// Directory downloaded files are written to.
    #[arg(short = 'd', long = "directory")]
    pub download_directory: Option<PathBuf>,

    /// Maximum number of browser processes.
    #[arg(short = 'p', long)]
    pub pool_size: Option<usize>,

    /// Chrome or Chromium executable.
    #[arg(long, env = "POSTGRAB_CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// Show the browser windows.
    #[arg(long)]
    pub headful: bool,

    /// Content type, overriding what the URL suggests.
    #[arg(short = 't', long = "type", value_enum)]
    pub content_type: Option<ContentTypeArg>,

    /// Print manifests as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI content type argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ContentTypeArg {
    /// Regular feed post.
    Post,
    /// Story (expires after a day).
    Story,
    /// Short-form video.
    Reel,
    /// Story saved to a profile highlight.
    Highlight,
}

impl From<ContentTypeArg> for ContentType {
    fn from(arg: ContentTypeArg) -> Self {
        match arg {
            ContentTypeArg::Post => ContentType::Post,
            ContentTypeArg::Story => ContentType::Story,
            ContentTypeArg::Reel => ContentType::Reel,
            ContentTypeArg::Highlight => ContentType::Highlight,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(ref dir) = self.download_directory {
            config.storage.download_directory = Some(dir.clone());
        }

        if let Some(size) = self.pool_size {
            config.browser.pool_size = size;
        }

        if let Some(ref path) = self.chrome_path {
            config.browser.chrome_path = Some(path.clone());
        }

        // Boolean flags (only override if set to non-default)
        if self.headful {
            config.browser.headless = false;
        }
    }

    /// Content type forced on the command line, if any.
    pub fn content_type_override(&self) -> Option<ContentType> {
        self.content_type.map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urls_and_overrides() {
        let args = Args::try_parse_from([
            "postgrab",
            "https://www.instagram.com/p/Cabc/",
            "https://fb.watch/xyz/",
            "--pool-size",
            "4",
            "--headful",
            "--type",
            "reel",
            "-d",
            "/tmp/media",
        ])
        .unwrap();

        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.content_type_override(), Some(ContentType::Reel));

        let mut config = Config::default();
        args.merge_into_config(&mut config);
        assert_eq!(config.browser.pool_size, 4);
        assert!(!config.browser.headless);
        assert_eq!(
            config.storage.download_directory,
            Some(PathBuf::from("/tmp/media"))
        );
    }

    #[test]
    fn test_urls_required_unless_init_config() {
        assert!(Args::try_parse_from(["postgrab"]).is_err());

        let args = Args::try_parse_from(["postgrab", "--init-config"]).unwrap();
        assert!(args.init_config);
        assert!(args.urls.is_empty());
    }

    #[test]
    fn test_merge_leaves_unset_values_alone() {
        let args = Args::try_parse_from(["postgrab", "https://www.instagram.com/p/Cabc/"]).unwrap();
        let mut config = Config::default();
        config.browser.pool_size = 3;
        args.merge_into_config(&mut config);

        assert_eq!(config.browser.pool_size, 3);
        assert!(config.browser.headless);
        assert!(config.storage.download_directory.is_none());
    }
}
