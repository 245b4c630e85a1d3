use std::{collections::BTreeMap, time::SystemTime};

/// One resource-usage sample of the supervised child.
///
/// Forwarded to the metrics backend right away and never buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub timestamp: SystemTime,
    pub pid: u32,
    pub counters: BTreeMap<String, f64>,
}

impl MetricSample {
    pub fn new(pid: u32) -> Self {
        Self {
            timestamp: SystemTime::now(),
            pid,
            counters: BTreeMap::new(),
        }
    }

    /// Add a counter, returning `self` for chaining.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.counters.get(name).copied()
    }

    /// Timestamp as fractional seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> f64 {
        self.timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
