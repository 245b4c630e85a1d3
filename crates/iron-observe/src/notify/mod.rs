//! Operator notifications.
//!
//! A [`NotificationSink`] is selected once at startup from the `--loghook` value and
//! handed to the supervisor through its context. Delivery is best-effort: failures are
//! logged and never propagated.
mod chat;
pub use chat::{CHAT_WEBHOOK_ENV, ChatHook};

mod file;
pub use file::FileHook;

mod error;
pub use error::NotifyError;

use iron_model::Notification;
use tracing::{debug, warn};

/// Where notifications go.
#[derive(Debug, Clone, Default)]
pub enum NotificationSink {
    /// JSON webhook of a chat service.
    Chat(ChatHook),
    /// Append-only text file.
    File(FileHook),
    /// Drop everything.
    #[default]
    Null,
}

impl NotificationSink {
    /// Select a sink from a hook spec.
    ///
    /// - `""` / `"null"` / `"none"` → [`NotificationSink::Null`]
    /// - `"chat"` → [`NotificationSink::Chat`], webhook URL read from [`CHAT_WEBHOOK_ENV`]
    /// - anything else is treated as a file path
    pub fn from_hook(spec: &str) -> Result<Self, NotifyError> {
        match spec.trim() {
            "" | "null" | "none" => Ok(Self::Null),
            "chat" => ChatHook::from_env().map(Self::Chat),
            path => Ok(Self::File(FileHook::new(path))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::File(_) => "file",
            Self::Null => "null",
        }
    }

    /// Deliver one notification, logging (not returning) failures.
    pub async fn notify(&self, notification: &Notification) {
        let res = match self {
            Self::Chat(hook) => hook.send(notification).await,
            Self::File(hook) => hook.append(notification).await,
            Self::Null => return,
        };
        match res {
            Ok(()) => debug!(sink = self.kind(), title = %notification.title, "notification delivered"),
            Err(e) => warn!(sink = self.kind(), error = %e, "failed to deliver notification"),
        }
    }
}
