use std::time::Duration;

use iron_model::Notification;
use serde_json::json;

use crate::notify::NotifyError;

/// Environment variable holding the chat webhook URL.
pub const CHAT_WEBHOOK_ENV: &str = "IRON_CHAT_WEBHOOK";

const CHAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts `{"text": "<headline>"}` to an incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct ChatHook {
    client: reqwest::Client,
    url: String,
}

impl ChatHook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_env() -> Result<Self, NotifyError> {
        match std::env::var(CHAT_WEBHOOK_ENV) {
            Ok(url) if !url.trim().is_empty() => Ok(Self::new(url)),
            _ => Err(NotifyError::MissingEnv(CHAT_WEBHOOK_ENV)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        self.client
            .post(&self.url)
            .timeout(CHAT_TIMEOUT)
            .json(&json!({ "text": n.headline() }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
