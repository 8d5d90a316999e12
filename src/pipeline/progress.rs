// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for pipeline execution
// reference: uses indicatif for progress bars and tracks per-stage metrics

use super::executor::RunObserver;
use crate::error::PipelineError;
use crate::utils::PerformanceMetrics;
use crate::utils::logging::format_step;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Timing and output size of one executed stage.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageStats {
    pub name: String,
    pub records: usize,
    pub duration_ms: u64,
    pub throughput: f64,
}

impl StageStats {
    pub fn new(name: &str, records: usize, duration: Duration) -> Self {
        let metrics = PerformanceMetrics::new(name, records, duration);
        Self {
            name: metrics.operation,
            records: metrics.count,
            duration_ms: metrics.duration_ms,
            throughput: metrics.throughput,
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{}: {} records in {}ms",
            self.name, self.records, self.duration_ms
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub run_id: Uuid,
    pub stages: Vec<StageStats>,
    pub duration_ms: u64,
}

impl PipelineStats {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn push(&mut self, stage: StageStats) {
        self.stages.push(stage);
    }

    pub fn slowest_stage(&self) -> Option<&StageStats> {
        self.stages.iter().max_by_key(|s| s.duration_ms)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.stages.iter().map(StageStats::format).collect();
        if let Some(slowest) = self.slowest_stage() {
            lines.push(format!(
                "slowest: {} ({}ms)",
                slowest.name, slowest.duration_ms
            ));
        }
        lines.push(format!(
            "total: {} stages in {}ms",
            self.stages.len(),
            self.duration_ms
        ));
        lines
    }
}

/// Terminal progress display: one bar over the stage count plus a detail line.
pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    completed: AtomicUsize,
    records: AtomicUsize,
}

impl ProgressTracker {
    pub fn with_color(total_stages: usize, colored: bool) -> Self {
        let multi_progress = MultiProgress::new();

        let main_bar = create_progress_bar(&multi_progress, total_stages as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            completed: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
        }
    }

    /// Progress display that draws nothing; counters still update.
    pub fn hidden(total_stages: usize) -> Self {
        let main_bar = ProgressBar::hidden();
        main_bar.set_length(total_stages as u64);
        Self {
            main_bar,
            detail_bar: ProgressBar::hidden(),
            completed: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
        }
    }

    pub fn completed_stages(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn records_produced(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }

    pub fn finish(&self) {
        if !self.main_bar.is_finished() {
            self.main_bar.finish_with_message("Pipeline complete");
        }
        self.detail_bar.finish_and_clear();
    }

    fn update_detail_bar(&self, last: &str) {
        let message = format!(
            "Last: {} | Records: {}",
            last,
            self.records.load(Ordering::SeqCst)
        );
        self.detail_bar.set_message(message);
    }
}

impl RunObserver for ProgressTracker {
    fn stage_started(&self, position: usize, total: usize, stage: &str) {
        self.main_bar.set_message(format_step(position, total, stage));
    }

    fn stage_finished(&self, stats: &StageStats) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.records.fetch_add(stats.records, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar(&stats.format());
    }

    fn stage_failed(&self, stage: &str, _error: &PipelineError) {
        self.main_bar
            .abandon_with_message(format!("{} {}", stage, "failed".red().bold()));
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let template = if colored {
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}"
    } else {
        "{spinner} [{elapsed_precise}] [{bar:30}] {pos}/{len} {msg}"
    };
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        let chars = if colored { "█▓▒░" } else { "=>-" };
        bar.set_style(style.progress_chars(chars));
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}
