use crate::pool::{CompletionEvent, Outcome};
use crate::terminal;
use chrono::{DateTime, Local};
use futures::{Stream, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Instant;

const FILLED: char = '▰';
const EMPTY: char = '▱';

/// Running counters of one scrape. Only the aggregator mutates them.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub total: u64,
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub started: Instant,
    pub started_at: DateTime<Local>,
}

impl RunStats {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            failed: 0,
            started: Instant::now(),
            started_at: Local::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub url: String,
    pub reason: String,
}

/// Final report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: u64,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed_seconds: f64,
    pub started_at: String,
    /// False when the event stream ended before every URL reported back.
    pub complete: bool,
    pub failures: Vec<FailedItem>,
}

/// `[▰▰▱▱] 50% | 2/4` with `floor(width * completed / total)` filled cells.
pub fn render_bar(width: usize, completed: u64, total: u64) -> String {
    let (filled, percentage) = if total == 0 {
        (width, 100)
    } else {
        let completed = completed.min(total);
        (
            (width as u64 * completed / total) as usize,
            completed * 100 / total,
        )
    };

    let mut bar = String::with_capacity(width * FILLED.len_utf8() + 24);
    bar.push('[');
    bar.extend(std::iter::repeat_n(FILLED, filled));
    bar.extend(std::iter::repeat_n(EMPTY, width - filled));
    bar.push_str(&format!("] {}% | {}/{}", percentage, completed, total));
    bar
}

pub trait ProgressRenderer: Send {
    fn render(&mut self, stats: &RunStats);

    fn finish(&mut self, _summary: &RunSummary) {}
}

/// Clears the screen and redraws a text bar after every event.
pub struct PlainRenderer {
    bar_width: usize,
}

impl PlainRenderer {
    pub fn new(bar_width: usize) -> Self {
        Self { bar_width }
    }
}

impl ProgressRenderer for PlainRenderer {
    fn render(&mut self, stats: &RunStats) {
        terminal::clear_screen();
        println!("{}", render_bar(self.bar_width, stats.completed, stats.total));
    }
}

pub struct IndicatifRenderer {
    bar: ProgressBar,
    bar_width: usize,
}

impl IndicatifRenderer {
    pub fn new(multi: &MultiProgress, bar_width: usize) -> Self {
        let bar = multi.add(ProgressBar::new(0));
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:{}.cyan/blue}}] {{pos}}/{{len}} ({{eta}}) {{msg}}",
            bar_width
        );
        match ProgressStyle::default_bar().template(&template) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::warn!("Falling back to the default progress style: {}", e),
        }
        Self { bar, bar_width }
    }

    fn finished_template(&self) -> String {
        format!(
            "✅ [{{elapsed_precise}}] [{{bar:{}.green/blue}}] {{pos}}/{{len}} {{msg}}",
            self.bar_width
        )
    }
}

impl ProgressRenderer for IndicatifRenderer {
    fn render(&mut self, stats: &RunStats) {
        self.bar.set_length(stats.total);
        self.bar.set_position(stats.completed);
        self.bar
            .set_message(format!("Saved: {} | Failed: {}", stats.succeeded, stats.failed));
    }

    fn finish(&mut self, summary: &RunSummary) {
        if let Ok(style) = ProgressStyle::default_bar().template(&self.finished_template()) {
            self.bar.set_style(style.progress_chars("#>-"));
        }
        self.bar.finish_with_message(format!(
            "Saved: {} | Failed: {} - Completed",
            summary.succeeded, summary.failed
        ));
    }
}

/// Folds completion events into [`RunStats`] and decides when the run is over.
pub struct ProgressAggregator<R: ProgressRenderer> {
    stats: RunStats,
    renderer: R,
    failures: Vec<FailedItem>,
}

impl<R: ProgressRenderer> ProgressAggregator<R> {
    pub fn new(total: u64, renderer: R) -> Self {
        Self {
            stats: RunStats::new(total),
            renderer,
            failures: Vec::new(),
        }
    }

    /// Consumes events until `completed == total`. Stops early, with an
    /// incomplete summary, if the stream ends first.
    pub async fn consume<S>(mut self, mut events: S) -> RunSummary
    where
        S: Stream<Item = CompletionEvent> + Unpin,
    {
        self.renderer.render(&self.stats);

        while !self.stats.is_complete() {
            let Some(event) = events.next().await else {
                log::error!(
                    "Event stream closed after {} of {} item(s)",
                    self.stats.completed,
                    self.stats.total
                );
                break;
            };
            self.record(event);
            self.renderer.render(&self.stats);
        }

        let summary = self.summary();
        self.renderer.finish(&summary);
        summary
    }

    fn record(&mut self, event: CompletionEvent) {
        self.stats.completed += 1;
        match event.outcome {
            Outcome::Saved(_) => self.stats.succeeded += 1,
            Outcome::Failed(e) => {
                self.stats.failed += 1;
                self.failures.push(FailedItem {
                    url: event.url,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.stats.total,
            attempted: self.stats.completed,
            succeeded: self.stats.succeeded,
            failed: self.stats.failed,
            elapsed_seconds: self.stats.started.elapsed().as_secs_f64(),
            started_at: self.stats.started_at.to_rfc3339(),
            complete: self.stats.is_complete(),
            failures: self.failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DownloadError;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        frames: Arc<Mutex<Vec<(u64, u64)>>>,
        finished: Arc<Mutex<bool>>,
    }

    impl ProgressRenderer for Recorder {
        fn render(&mut self, stats: &RunStats) {
            self.frames.lock().unwrap().push((stats.completed, stats.total));
        }

        fn finish(&mut self, _summary: &RunSummary) {
            *self.finished.lock().unwrap() = true;
        }
    }

    fn saved(url: &str) -> CompletionEvent {
        CompletionEvent {
            worker: 0,
            url: url.to_string(),
            outcome: Outcome::Saved(PathBuf::from("x")),
        }
    }

    fn failed(url: &str) -> CompletionEvent {
        CompletionEvent {
            worker: 1,
            url: url.to_string(),
            outcome: Outcome::Failed(DownloadError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    #[test]
    fn bar_splits_width_proportionally() {
        assert_eq!(render_bar(4, 0, 4), "[▱▱▱▱] 0% | 0/4");
        assert_eq!(render_bar(4, 2, 4), "[▰▰▱▱] 50% | 2/4");
        assert_eq!(render_bar(10, 1, 3), "[▰▰▰▱▱▱▱▱▱▱] 33% | 1/3");
        assert_eq!(render_bar(4, 4, 4), "[▰▰▰▰] 100% | 4/4");
    }

    #[test]
    fn finished_bar_keeps_configured_width() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let renderer = IndicatifRenderer::new(&multi, 12);
        assert!(renderer.finished_template().contains("{bar:12.green/blue}"));
    }

    #[test]
    fn empty_run_renders_full_bar() {
        assert_eq!(render_bar(3, 0, 0), "[▰▰▰] 100% | 0/0");
        assert!(RunStats::new(0).is_complete());
    }

    #[tokio::test]
    async fn counts_successes_and_failures_until_total() {
        let recorder = Recorder::default();
        let events = futures::stream::iter(vec![
            saved("a"),
            failed("b"),
            saved("c"),
            saved("never consumed"),
        ]);

        let summary = ProgressAggregator::new(3, recorder.clone())
            .consume(events)
            .await;

        assert!(summary.complete);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].url, "b");
        assert_eq!(
            *recorder.frames.lock().unwrap(),
            vec![(0, 3), (1, 3), (2, 3), (3, 3)]
        );
        assert!(*recorder.finished.lock().unwrap());
    }

    #[tokio::test]
    async fn zero_total_completes_without_events() {
        let recorder = Recorder::default();
        let summary = ProgressAggregator::new(0, recorder.clone())
            .consume(futures::stream::pending::<CompletionEvent>())
            .await;

        assert!(summary.complete);
        assert_eq!(summary.attempted, 0);
        assert_eq!(*recorder.frames.lock().unwrap(), vec![(0, 0)]);
    }

    #[tokio::test]
    async fn closed_stream_yields_incomplete_summary() {
        let summary = ProgressAggregator::new(2, Recorder::default())
            .consume(futures::stream::iter(vec![saved("a")]))
            .await;

        assert!(!summary.complete);
        assert_eq!(summary.attempted, 1);
    }
}
