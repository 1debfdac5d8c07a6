use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;
use persist_fetch::{FetchPhase, Progress};

use super::human_size;

const PB_STYLE: &str =
    "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(PB_STYLE)
        .ok()
        .map(|style| style.tick_chars(TICK).progress_chars(PB_CHARS))
});

/// Terminal view of one download: `fetched / total [reconnects]`.
#[derive(Debug, Clone)]
pub struct DownloadTracker {
    pb: ProgressBar,
}

impl DownloadTracker {
    pub fn new(quiet: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        if quiet {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        let pb = match PB_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        Self { pb }
    }

    /// Progress callback feeding this tracker.
    pub fn callback(&self) -> Arc<dyn Fn(&Progress) + Send + Sync> {
        let tracker = self.clone();
        Arc::new(move |progress: &Progress| tracker.update(progress))
    }

    pub fn update(&self, progress: &Progress) {
        if let Some(total) = progress.total_bytes
            && self.pb.length() != Some(total)
        {
            self.pb.set_length(total);
        }
        self.pb.set_position(progress.bytes_downloaded);
        self.pb.set_prefix(progress.phase.to_string());
        self.pb.set_message(status_line(progress));
        if progress.phase == FetchPhase::Connecting {
            self.pb.tick();
        }
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, line: impl AsRef<str>) {
        if self.pb.is_hidden() {
            eprintln!("{}", line.as_ref());
        } else {
            self.pb.println(line);
        }
    }

    pub fn finish(&self) { self.pb.finish(); }

    pub fn abandon(&self) { self.pb.abandon(); }
}

fn status_line(progress: &Progress) -> String {
    let total = progress
        .total_bytes
        .map(human_size)
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{} / {} [{}]",
        human_size(progress.bytes_downloaded),
        total,
        progress.reconnects
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let progress = Progress {
            phase: FetchPhase::Downloading,
            bytes_downloaded: 2048,
            total_bytes: Some(10 * 1024 * 1024),
            reconnects: 3,
            passive_naps: 0,
        };
        assert_eq!(status_line(&progress), "2.00 KB / 10.00 MB [3]");
    }

    #[test]
    fn test_unknown_total() {
        let progress = Progress::default();
        assert_eq!(status_line(&progress), "0 B / ? [0]");
    }

    #[test]
    fn test_hidden_tracker_follows_progress() {
        let tracker = DownloadTracker::new(true);
        let callback = tracker.callback();
        callback(&Progress {
            phase: FetchPhase::Downloading,
            bytes_downloaded: 10,
            total_bytes: Some(100),
            reconnects: 0,
            passive_naps: 0,
        });
        assert_eq!(tracker.pb.position(), 10);
        assert_eq!(tracker.pb.length(), Some(100));
    }
}
