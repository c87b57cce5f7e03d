use std::collections::HashMap;
use std::time::Instant;

/// Observer for per-frame pipeline events.
///
/// Keeps the processing loop free of output concerns: the CLI reports
/// progress and a summary, tests and embedders can stay silent.
pub trait PipelineLogger: Send {
    /// A frame reached the preview sink.
    fn frame_published(&mut self, index: u64);

    /// A frame was discarded; `reason` is a short label such as `detection`.
    fn frame_dropped(&mut self, index: u64, reason: &str);

    /// `count` frames were discarded before reaching the pipeline, e.g. by
    /// back-pressure. Default: no-op.
    fn frames_skipped(&mut self, _count: u64, _reason: &str) {}

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_published(&mut self, _index: u64) {}
    fn frame_dropped(&mut self, _index: u64, _reason: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Running aggregate of one timing stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: u64,
    pub total: f64,
    pub max: f64,
}

impl RunningStat {
    fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn avg(&self) -> f64 {
        self.total / self.count.max(1) as f64
    }
}

/// CLI-oriented logger: periodic progress lines plus a session summary
/// with per-stage averages, drop counts and throughput.
///
/// Progress output is throttled to every `throttle_frames` published
/// frames. Only aggregates are kept, so memory stays flat however long the
/// session runs.
pub struct StdoutPipelineLogger {
    throttle_frames: u64,
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    drops: HashMap<String, u64>,
    start_time: Instant,
    published: u64,
    last_index: Option<u64>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            drops: HashMap::new(),
            start_time: Instant::now(),
            published: 0,
            last_index: None,
        }
    }

    /// Returns the formatted summary string, or `None` if nothing happened.
    pub fn summary_string(&self) -> Option<String> {
        if self.published == 0 && self.drops.is_empty() && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let dropped: u64 = self.drops.values().sum();
        let mut lines = Vec::new();

        lines.push(format!(
            "Session summary ({} published, {dropped} dropped, {:.1}s total):",
            self.published,
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stat = &self.timings[stage];
            let (avg_ms, max_ms) = (stat.avg(), stat.max);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let avg = self.metrics[name].avg();
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        let mut reasons: Vec<_> = self.drops.iter().collect();
        reasons.sort();
        for (reason, count) in reasons {
            lines.push(format!("  dropped ({reason}): {count}"));
        }

        if self.published > 0 && elapsed_ms > 0.0 {
            let fps = self.published as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }

    pub fn drops_for(&self, reason: &str) -> u64 {
        self.drops.get(reason).copied().unwrap_or(0)
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame_published(&mut self, index: u64) {
        self.published += 1;
        self.last_index = Some(index);
        if self.published % self.throttle_frames == 0 {
            let secs = self.start_time.elapsed().as_secs_f64();
            let fps = if secs > 0.0 {
                self.published as f64 / secs
            } else {
                0.0
            };
            log::info!(
                "Published {} frames (latest #{index}, {fps:.1} fps)",
                self.published
            );
        }
    }

    fn frame_dropped(&mut self, index: u64, reason: &str) {
        *self.drops.entry(reason.to_string()).or_default() += 1;
        log::debug!("Dropped frame {index} ({reason})");
    }

    fn frames_skipped(&mut self, count: u64, reason: &str) {
        if count > 0 {
            *self.drops.entry(reason.to_string()).or_default() += count;
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
