//! Prometheus metrics backend for the iron supervisor.
//!
//! [`PrometheusMetrics`] implements [`iron_core::MetricsBackend`]. The agent serves
//! [`PrometheusMetrics::encode_text`] on `/metrics` when an exposition address is set.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use iron_core::SupervisorContext;
//! use iron_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let ctx = SupervisorContext::new("web").with_metrics(Arc::new(metrics.clone()));
//! # let _ = ctx;
//! let body = metrics.encode_text()?;
//! assert!(body.contains("iron_child_spawns_total"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `iron_child_spawns_total` - Counter
//! - `iron_child_exits_total{outcome}` - Counter
//! - `iron_child_lifetime_seconds` - Histogram
//! - `iron_child_reloads_total{mode}` - Counter
//! - `iron_child_sample{counter}` - Gauge, latest resource sample
//! - `iron_child_sample_timestamp_seconds` - Gauge
mod backend;
pub use backend::PrometheusMetrics;
