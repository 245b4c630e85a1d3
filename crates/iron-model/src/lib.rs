mod domain;
pub use domain::{EnvMap, KvPair, KvSnapshot};
pub use domain::{INTERNAL_FAILURE_EXIT_CODE, METADATA_SEGMENT, SIGNAL_EXIT_BASE};

mod error;
pub use error::ModelError;

mod catalog;
pub use catalog::{HealthCheck, HealthStatus, ServiceEntry, ServiceInstance, ServiceLink};
pub use catalog::{HEALTH_PASSING, parse_links};

mod telemetry;
pub use telemetry::{HostInfo, MetricSample, Notification, Severity};
