use std::{fmt, sync::Arc};

use iron_model::Notification;
use iron_observe::NotificationSink;

use crate::metrics::MetricsHandle;

/// Explicit context handed to every supervision component.
///
/// Carries the application name used in log fields and notifications, the metrics
/// backend, and the notification sink selected at startup. Cheap to clone.
#[derive(Clone)]
pub struct SupervisorContext {
    app: Arc<str>,
    metrics: MetricsHandle,
    notifier: Arc<NotificationSink>,
}

impl SupervisorContext {
    /// Create a context with no-op metrics and a null notification sink.
    pub fn new(app: impl AsRef<str>) -> Self {
        Self {
            app: Arc::from(app.as_ref()),
            metrics: crate::metrics::noop_metrics(),
            notifier: Arc::new(NotificationSink::Null),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    /// Get a clonable handle to the metrics backend.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn notifier(&self) -> &NotificationSink {
        &self.notifier
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the notification sink and return updated context.
    pub fn with_notifier(mut self, notifier: NotificationSink) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Send an error-level notification tagged with the application name.
    pub async fn notify_error(&self, title: &str, message: impl Into<String>) {
        self.notifier
            .notify(&Notification::error(self.app(), title, message))
            .await;
    }

    /// Send a warning-level notification tagged with the application name.
    pub async fn notify_warning(&self, title: &str, message: impl Into<String>) {
        self.notifier
            .notify(&Notification::warning(self.app(), title, message))
            .await;
    }
}

impl fmt::Debug for SupervisorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorContext")
            .field("app", &self.app)
            .field("metrics", &"<handle>")
            .field("notifier", &self.notifier.kind())
            .finish()
    }
}

impl fmt::Display for SupervisorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SupervisorContext(app={}, notifier={})", self.app, self.notifier.kind())
    }
}
