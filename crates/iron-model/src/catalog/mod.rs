mod link;
pub use link::{ServiceLink, parse_links};

mod service;
pub use service::{HEALTH_PASSING, HealthCheck, HealthStatus, ServiceEntry, ServiceInstance};
