// file: src/ingest/progress.rs
// description: progress tracking and statistics reporting for ingestion runs
// reference: uses indicatif for progress bars and tracks per-repo metrics

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub repos_processed: usize,
    pub repos_failed: usize,
    pub signals_computed: usize,
    pub commits_ingested: usize,
    pub duration_secs: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repos_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.repos_processed as f64 / self.duration_secs as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.repos_processed + self.repos_failed;
        if total == 0 {
            return 0.0;
        }
        (self.repos_processed as f64 / total as f64) * 100.0
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    repos_processed: Arc<AtomicUsize>,
    repos_failed: Arc<AtomicUsize>,
    signals_computed: Arc<AtomicUsize>,
    commits_ingested: Arc<AtomicUsize>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_repos: usize) -> Self {
        let multi_progress = MultiProgress::new();
        let main_bar = create_progress_bar(&multi_progress, total_repos as u64);
        let detail_bar = create_detail_bar(&multi_progress);
        Self::build(main_bar, detail_bar)
    }

    /// Background runs have no terminal to draw on; counters still accumulate.
    pub fn hidden() -> Self {
        Self::build(ProgressBar::hidden(), ProgressBar::hidden())
    }

    fn build(main_bar: ProgressBar, detail_bar: ProgressBar) -> Self {
        Self {
            main_bar,
            detail_bar,
            repos_processed: Arc::new(AtomicUsize::new(0)),
            repos_failed: Arc::new(AtomicUsize::new(0)),
            signals_computed: Arc::new(AtomicUsize::new(0)),
            commits_ingested: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    /// The repo count is only known after the listing call; resize the bar.
    pub fn set_total(&self, total: usize) {
        self.main_bar.set_length(total as u64);
    }

    pub fn inc_repos_processed(&self) {
        self.repos_processed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_repos_failed(&self) {
        self.repos_failed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn add_signals(&self) {
        self.signals_computed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_commits(&self, count: usize) {
        self.commits_ingested.fetch_add(count, Ordering::SeqCst);
    }

    pub fn set_message(&self, message: String) {
        self.detail_bar.set_message(message);
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Ingestion complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> IngestStats {
        IngestStats {
            repos_processed: self.repos_processed.load(Ordering::SeqCst),
            repos_failed: self.repos_failed.load(Ordering::SeqCst),
            signals_computed: self.signals_computed.load(Ordering::SeqCst),
            commits_ingested: self.commits_ingested.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn update_detail_bar(&self) {
        let signals = self.signals_computed.load(Ordering::SeqCst);
        let commits = self.commits_ingested.load(Ordering::SeqCst);
        let failed = self.repos_failed.load(Ordering::SeqCst);

        self.detail_bar
            .set_message(format!("Signals: {signals} | Commits: {commits} | Failed: {failed}"));
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .expect("Failed to create progress bar template")
            .progress_chars("█▓▒░"),
    );
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    let style = ProgressStyle::default_bar()
        .template("{msg}")
        .expect("Failed to create detail bar template");
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_stats_rates() {
        let stats = IngestStats {
            repos_processed: 9,
            repos_failed: 1,
            signals_computed: 9,
            commits_ingested: 400,
            duration_secs: 3,
        };
        assert_eq!(stats.repos_per_second(), 3.0);
        assert_eq!(stats.success_rate(), 90.0);
    }

    #[test]
    fn test_ingest_stats_zero_duration() {
        let stats = IngestStats::new();
        assert_eq!(stats.repos_per_second(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_hidden_tracker_counts() {
        let tracker = ProgressTracker::hidden();
        tracker.inc_repos_processed();
        tracker.inc_repos_failed();
        tracker.add_signals();
        tracker.add_commits(25);

        let stats = tracker.get_stats();
        assert_eq!(stats.repos_processed, 1);
        assert_eq!(stats.repos_failed, 1);
        assert_eq!(stats.signals_computed, 1);
        assert_eq!(stats.commits_ingested, 25);
    }
}
