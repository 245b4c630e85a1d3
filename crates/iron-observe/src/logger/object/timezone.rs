use std::{fmt, str::FromStr, sync::RwLock};

use serde::{Deserialize, Serialize};
use time::UtcOffset;
use tracing::debug;

use crate::logger::error::LoggerError;

/// Cached local offset; detection only works reliably before worker threads exist.
static LOCAL_OFFSET: RwLock<UtcOffset> = RwLock::new(UtcOffset::UTC);

/// Timezone used for log timestamps.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoggerTimeZone {
    #[default]
    Utc,
    Local,
}

impl FromStr for LoggerTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerTimeZone::Utc => "utc",
            LoggerTimeZone::Local => "local",
        })
    }
}

/// Detect and cache the local offset. Call from `main()` before starting the runtime.
///
/// Falls back to UTC when detection fails.
pub fn init_local_offset() {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    if let Ok(mut guard) = LOCAL_OFFSET.write() {
        *guard = offset;
    }
}

/// Re-detect the local offset, keeping the cached value when detection is unavailable.
///
/// Returns `true` when the cached offset changed.
#[cfg_attr(not(feature = "timezone-sync"), allow(dead_code))]
pub(crate) fn sync_local_offset() -> bool {
    let Ok(detected) = UtcOffset::current_local_offset() else {
        debug!("timezone sync skipped (offset not detectable from this thread)");
        return false;
    };
    let Ok(mut guard) = LOCAL_OFFSET.write() else {
        return false;
    };
    if *guard == detected {
        return false;
    }
    debug!(from = %format_offset(*guard), to = %format_offset(detected), "local offset changed");
    *guard = detected;
    true
}

pub(crate) fn cached_local_offset() -> UtcOffset {
    LOCAL_OFFSET
        .read()
        .map(|guard| *guard)
        .unwrap_or(UtcOffset::UTC)
}

/// `UTC±HH` or `UTC±HH:MM`.
fn format_offset(offset: UtcOffset) -> String {
    let (hours, minutes) = (offset.whole_hours(), offset.minutes_past_hour());
    if minutes == 0 {
        format!("UTC{hours:+03}")
    } else {
        format!("UTC{hours:+03}:{:02}", minutes.abs())
    }
}
