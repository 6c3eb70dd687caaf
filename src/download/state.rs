//! Request lifecycle states and run statistics.

use std::fmt;

use crate::error::Result;
use crate::media::DownloadManifest;

/// Where a download request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Queued,
    Acquiring,
    Navigating,
    Extracting,
    Fetching,
    FallingBack,
    Ready,
    Failed,
}

impl Stage {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Queued, Acquiring)
                | (Acquiring, Navigating)
                | (Acquiring, FallingBack)
                | (Navigating, Extracting)
                | (Navigating, FallingBack)
                | (Extracting, Fetching)
                | (Extracting, FallingBack)
                | (Fetching, Ready)
                | (Fetching, FallingBack)
                | (FallingBack, Ready)
                | (FallingBack, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Ready | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Queued => "queued",
            Stage::Acquiring => "acquiring",
            Stage::Navigating => "navigating",
            Stage::Extracting => "extracting",
            Stage::Fetching => "fetching",
            Stage::FallingBack => "falling back",
            Stage::Ready => "ready",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Follows one request through its stages and keeps the path it took.
#[derive(Debug)]
pub struct StageTracker {
    url: String,
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            history: vec![Stage::Queued],
        }
    }

    pub fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Queued)
    }

    /// Move to `next`. Illegal moves are logged and ignored.
    pub fn advance(&mut self, next: Stage) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::error!(
                "Illegal stage change {} -> {} for {}",
                current,
                next,
                self.url
            );
            return;
        }
        tracing::debug!("{}: {} -> {}", self.url, current, next);
        self.history.push(next);
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Stage> {
        self.history
    }
}

/// Totals across one batch of requests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub primary: u64,
    pub substitute: u64,
    pub failed: u64,
    pub bytes_written: u64,
}

impl RunStats {
    pub fn record(&mut self, result: &Result<DownloadManifest>) {
        match result {
            Ok(manifest) => {
                if manifest.is_substitute() {
                    self.substitute += 1;
                } else {
                    self.primary += 1;
                }
                self.bytes_written += manifest.size_bytes;
            }
            Err(_) => self.failed += 1,
        }
    }

    pub fn from_results(results: &[Result<DownloadManifest>]) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(result);
        }
        stats
    }

    pub fn total(&self) -> u64 {
        self.primary + self.substitute + self.failed
    }

    pub fn succeeded(&self) -> u64 {
        self.primary + self.substitute
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::media::{MediaKind, StoredFile};

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            Stage::Queued,
            Stage::Acquiring,
            Stage::Navigating,
            Stage::Extracting,
            Stage::Fetching,
            Stage::Ready,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_fallback_reachable_only_from_working_stages() {
        for stage in [
            Stage::Acquiring,
            Stage::Navigating,
            Stage::Extracting,
            Stage::Fetching,
        ] {
            assert!(stage.can_transition_to(Stage::FallingBack));
        }
        assert!(!Stage::Queued.can_transition_to(Stage::FallingBack));
        assert!(!Stage::Ready.can_transition_to(Stage::FallingBack));
        assert!(!Stage::FallingBack.can_transition_to(Stage::Fetching));
    }

    #[test]
    fn test_terminal_stages_go_nowhere() {
        let all = [
            Stage::Queued,
            Stage::Acquiring,
            Stage::Navigating,
            Stage::Extracting,
            Stage::Fetching,
            Stage::FallingBack,
            Stage::Ready,
            Stage::Failed,
        ];
        for terminal in [Stage::Ready, Stage::Failed] {
            assert!(terminal.is_terminal());
            assert!(all.iter().all(|next| !terminal.can_transition_to(*next)));
        }
    }

    #[test]
    fn test_tracker_ignores_illegal_moves() {
        let mut tracker = StageTracker::new("https://www.instagram.com/p/x/");
        tracker.advance(Stage::Acquiring);
        tracker.advance(Stage::Ready);
        assert_eq!(tracker.current(), Stage::Acquiring);
        assert_eq!(tracker.history(), &[Stage::Queued, Stage::Acquiring]);
    }

    #[test]
    fn test_run_stats_counts_outcomes() {
        let file = StoredFile {
            path: "downloads/a.jpg".into(),
            filename: "a.jpg".to_string(),
            size_bytes: 100,
            kind: MediaKind::Image,
        };
        let primary = DownloadManifest::from_stored(&file, "/downloads", None);
        let substitute =
            DownloadManifest::from_stored(&file, "/downloads", Some("Substitute content served: x".into()));

        let results = vec![
            Ok(primary),
            Ok(substitute),
            Err(Error::Fallback {
                original: "a".into(),
                fallback: "b".into(),
            }),
        ];
        let stats = RunStats::from_results(&results);

        assert_eq!(stats.primary, 1);
        assert_eq!(stats.substitute, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.bytes_written, 200);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.succeeded(), 2);
    }
}
