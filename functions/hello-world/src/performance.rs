//! Per-request latency tracking.
//!
//! A tracker is created at the start of every invocation and records the
//! `handler:initialize` baseline mark at that moment. Checkpoints are measured
//! against that baseline and each measurement is published to a
//! [`MetricsSink`] and logged.

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::metrics::MetricsSink;

pub const INITIALIZE_MARK: &str = "handler:initialize";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PerformanceError {
    #[error("no performance mark named `{0}`")]
    UnknownMark(String),
}

/// A completed measurement, in the shape it is logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    pub name: String,
    pub entry_type: &'static str,
    /// Milliseconds from the baseline mark to the start mark.
    pub start_time: f64,
    pub duration: f64,
}

pub struct PerformanceTracker<'s, M: MetricsSink + ?Sized> {
    function_name: &'s str,
    sink: &'s M,
    origin: Instant,
    marks: Vec<(String, Instant)>,
    entries: Vec<PerformanceEntry>,
}

impl<'s, M: MetricsSink + ?Sized> PerformanceTracker<'s, M> {
    pub fn start(function_name: &'s str, sink: &'s M) -> Self {
        let origin = Instant::now();
        Self {
            function_name,
            sink,
            origin,
            marks: vec![(INITIALIZE_MARK.to_string(), origin)],
            entries: Vec::new(),
        }
    }

    pub fn mark(&mut self, name: &str) {
        self.marks.push((name.to_string(), Instant::now()));
    }

    fn find(&self, name: &str) -> Result<Instant, PerformanceError> {
        // latest mark wins when a name is reused
        self.marks
            .iter()
            .rev()
            .find(|(mark, _)| mark == name)
            .map(|(_, at)| *at)
            .ok_or_else(|| PerformanceError::UnknownMark(name.to_string()))
    }

    /// Measures the time between two marks, publishes it and logs the entries so far.
    pub fn measure(&mut self, name: &str, from: &str, to: &str) -> Result<&PerformanceEntry, PerformanceError> {
        let start = self.find(from)?;
        let end = self.find(to)?;

        let entry = PerformanceEntry {
            name: name.to_string(),
            entry_type: "measure",
            start_time: millis(start.saturating_duration_since(self.origin)),
            duration: millis(end.saturating_duration_since(start)),
        };

        self.sink.publish_latency(self.function_name, &entry.name, entry.duration);
        let index = self.entries.len();
        self.entries.push(entry);

        tracing::info!(
            source = %format!("{}:index", self.function_name),
            event = "performance",
            entries = %serde_json::to_string(&self.entries).unwrap_or_default(),
            "performance"
        );

        Ok(&self.entries[index])
    }

    /// Marks `label` and measures it against the initialize baseline.
    pub fn measure_function_performance(&mut self, label: &str) {
        self.mark(label);
        if let Err(error) = self.measure(&format!("measure:{label}"), INITIALIZE_MARK, label) {
            tracing::warn!(error = %error, "failed to measure function performance");
        }
    }

    pub fn entries(&self) -> &[PerformanceEntry] {
        &self.entries
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
