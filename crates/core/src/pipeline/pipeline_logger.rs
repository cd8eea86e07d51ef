use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for run progress, per-stage timings and per-sample metrics.
///
/// Stage names used by the pipeline: `detect`, `embed`, `track`,
/// `annotate`, `write`. Metric names: `detections`, `confirmed_tracks`.
pub trait PipelineLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Library default and test logger.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and peak of a series of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl SeriesStats {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = if self.count == 1 {
            value
        } else {
            self.max.max(value)
        };
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Logs through the `log` facade: throttled progress lines during the run
/// and a timing/metric table at the end.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, SeriesStats>,
    metrics: BTreeMap<String, SeriesStats>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    /// `None` until at least one timing or metric has been recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let elapsed_ms = elapsed_s * 1000.0;

        let mut lines = vec![format!(
            "Run summary ({} frames, {elapsed_s:.1}s):",
            self.frames_seen
        )];
        for (stage, stats) in &self.timings {
            let share = if elapsed_ms > 0.0 {
                stats.total / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10} avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms ({share:4.1}%)",
                stats.mean(),
                stats.max,
                stats.total
            ));
        }
        for (name, stats) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}, max {:.0}",
                stats.mean(),
                stats.max
            ));
        }
        if self.frames_seen > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_seen as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processed {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processed {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("detections", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_stats() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 40.0);
        logger.timing("track", 1.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.mean(), 30.0);
        assert_relative_eq!(detect.max, 40.0);
        assert_eq!(logger.timings_for("track").unwrap().count, 1);
        assert!(logger.timings_for("write").is_none());
    }

    #[test]
    fn test_metric_max_tracks_negative_series() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("delta", -3.0);
        logger.metric("delta", -1.0);
        assert_relative_eq!(logger.metrics_for("delta").unwrap().max, -1.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(30, 30);
        logger.timing("detect", 12.0);
        logger.timing("annotate", 2.0);
        logger.metric("confirmed_tracks", 2.0);
        logger.metric("confirmed_tracks", 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("30 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("annotate"));
        assert!(summary.contains("confirmed_tracks: avg 2.5, max 3"));
    }

    #[test]
    fn test_empty_summary_is_none() {
        assert!(StdoutPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_progress_records_frames_seen() {
        let mut logger = StdoutPipelineLogger::new(7);
        for i in 1..=20 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.frames_seen, 20);
    }
}
