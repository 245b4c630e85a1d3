use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Operator-facing event pushed to the configured notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub app: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn error(app: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            severity: Severity::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn warning(app: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(app, title, message)
        }
    }

    /// Single-line rendering used by text sinks.
    pub fn headline(&self) -> String {
        format!("[{} - {}] {}: {}", self.app, self.severity, self.title, self.message)
    }
}
