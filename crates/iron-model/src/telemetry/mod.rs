mod sample;
pub use sample::MetricSample;

mod host;
pub use host::HostInfo;

mod notification;
pub use notification::{Notification, Severity};
