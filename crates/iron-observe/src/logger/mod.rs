mod config;
mod error;
mod log;
mod object;
mod tasks;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerTimeZone, init_local_offset};

#[cfg(feature = "timezone-sync")]
pub use tasks::timezone_sync;

/// Installs the global tracing subscriber described by `cfg`.
///
/// Call once, early in `main()`. For [`LoggerTimeZone::Local`] also call
/// [`init_local_offset`] before the tokio runtime starts its worker threads.
///
/// # Examples
/// ```rust
/// use iron_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::for_verbosity(false);
/// init_logger(&config).expect("logger");
/// tracing::info!("supervisor starting");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::logger_text(cfg),
        LoggerFormat::Json => log::logger_json(cfg),
        LoggerFormat::Journald => log::logger_journald(cfg),
    }
}
