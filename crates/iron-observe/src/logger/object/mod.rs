mod format;
pub use format::LoggerFormat;

mod level;
pub use level::LoggerLevel;

mod rfc3339;
pub use rfc3339::LoggerRfc3339;

pub(crate) mod timezone;
pub use timezone::{LoggerTimeZone, init_local_offset};
