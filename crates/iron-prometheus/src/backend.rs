use std::sync::Arc;

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use iron_core::{ExitOutcome, MetricsBackend, MetricsError, ReloadMode};
use iron_model::MetricSample;

const NAMESPACE: &str = "iron";

/// Prometheus metrics backend.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `outcome`: "success", "failure", "signaled", "lost"
/// - `mode`: "graceful", "forced"
/// - `counter`: the fixed set of sampler counter names
#[derive(Clone)]
pub struct PrometheusMetrics {
    spawns: Counter,
    exits: CounterVec,
    lifetime: Histogram,
    reloads: CounterVec,
    sample: GaugeVec,
    sample_timestamp: Gauge,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let spawns = Counter::with_opts(
            Opts::new("child_spawns_total", "Total number of child processes started").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(spawns.clone()))?;

        let exits = CounterVec::new(
            Opts::new("child_exits_total", "Total number of child exits by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(exits.clone()))?;

        let lifetime = Histogram::with_opts(
            HistogramOpts::new("child_lifetime_seconds", "Child lifetime from spawn to exit in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 21600.0, 86400.0]),
        )?;
        registry.register(Box::new(lifetime.clone()))?;

        let reloads = CounterVec::new(
            Opts::new("child_reloads_total", "Total number of reloads by retirement mode").namespace(NAMESPACE),
            &["mode"],
        )?;
        registry.register(Box::new(reloads.clone()))?;

        let sample = GaugeVec::new(
            Opts::new("child_sample", "Latest resource sample of the child").namespace(NAMESPACE),
            &["counter"],
        )?;
        registry.register(Box::new(sample.clone()))?;

        let sample_timestamp = Gauge::with_opts(
            Opts::new("child_sample_timestamp_seconds", "Unix time of the latest resource sample")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(sample_timestamp.clone()))?;

        Ok(Self {
            spawns,
            exits,
            lifetime,
            reloads,
            sample,
            sample_timestamp,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with default registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every metric in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`PrometheusMetrics::encode_text`].
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Get reference to underlying prometheus registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_spawn(&self) {
        self.spawns.inc();
    }

    fn record_exit(&self, outcome: ExitOutcome, lifetime_ms: u64) {
        self.exits.with_label_values(&[outcome.as_label()]).inc();
        self.lifetime.observe(lifetime_ms as f64 / 1000.0);
    }

    fn record_reload(&self, mode: ReloadMode) {
        self.reloads.with_label_values(&[mode.as_label()]).inc();
    }

    fn record_sample(&self, sample: &MetricSample) -> Result<(), MetricsError> {
        for (name, value) in &sample.counters {
            if !value.is_finite() {
                return Err(MetricsError::Rejected(format!("{name} is not finite")));
            }
            self.sample
                .get_metric_with_label_values(&[name.as_str()])
                .map_err(|e| MetricsError::Rejected(e.to_string()))?
                .set(*value);
        }
        self.sample_timestamp.set(sample.unix_seconds());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn can_create_prometheus_metrics() {
        let _metrics = PrometheusMetrics::new().expect("failed to create metrics");
    }

    #[test]
    fn lifecycle_counters_are_labelled() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_spawn();
        metrics.record_spawn();
        metrics.record_exit(ExitOutcome::Success, 1500);
        metrics.record_exit(ExitOutcome::Signaled, 20);
        metrics.record_reload(ReloadMode::Forced);

        let families = metrics.gather();
        assert_eq!(family(&families, "iron_child_exits_total").get_metric().len(), 2);
        assert_eq!(family(&families, "iron_child_reloads_total").get_metric().len(), 1);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("iron_child_spawns_total 2"));
        assert!(text.contains(r#"iron_child_exits_total{outcome="signaled"} 1"#));
        assert!(text.contains("iron_child_lifetime_seconds_count 2"));
    }

    #[test]
    fn samples_overwrite_gauges() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics
            .record_sample(&MetricSample::new(1).with("cpu.percent", 10.0).with("mem.rss.bytes", 2048.0))
            .unwrap();
        metrics
            .record_sample(&MetricSample::new(1).with("cpu.percent", 3.0))
            .unwrap();

        let text = metrics.encode_text().unwrap();
        assert!(text.contains(r#"iron_child_sample{counter="cpu.percent"} 3"#));
        assert!(text.contains(r#"iron_child_sample{counter="mem.rss.bytes"} 2048"#));
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let metrics = PrometheusMetrics::new().unwrap();
        let err = metrics
            .record_sample(&MetricSample::new(1).with("cpu.percent", f64::NAN))
            .unwrap_err();
        assert!(matches!(err, MetricsError::Rejected(_)));
    }

    #[test]
    fn can_use_custom_registry() {
        let registry = Arc::new(Registry::new());
        let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();

        metrics.record_spawn();
        assert!(!registry.gather().is_empty());
    }
}
