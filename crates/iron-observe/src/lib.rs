mod logger;
pub use logger::*;

#[cfg(feature = "timezone-sync")]
pub use logger::timezone_sync;

mod notify;
pub use notify::{ChatHook, FileHook, NotificationSink, NotifyError, CHAT_WEBHOOK_ENV};
