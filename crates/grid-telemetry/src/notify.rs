//! Webhook push notifications for kill-switch and shutdown events.
//!
//! Posts Lark-style text messages to a flow-trigger webhook. Delivery is
//! best-effort: the bot never blocks a trading decision on a failed or
//! slow notification.

use crate::error::TelemetryResult;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://www.feishu.cn/flow/api/trigger-webhook";
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    msg_type: &'static str,
    content: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

/// Fire-and-forget webhook notifier.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(token: &str, base_url: Option<&str>) -> TelemetryResult<Self> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        Ok(Self {
            client: reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?,
            webhook_url: format!("{base}/{token}"),
        })
    }

    /// Notifier from the `LARK_TOKEN` environment variable; `None` when
    /// notifications are not configured.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("LARK_TOKEN").ok()?;
        if token.is_empty() {
            return None;
        }
        match Self::new(&token, None) {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                warn!(error = %e, "Failed to build webhook notifier");
                None
            }
        }
    }

    /// Send a text message. Failures are logged and swallowed.
    pub async fn send_text(&self, text: &str) {
        let payload = TextPayload {
            msg_type: "text",
            content: TextContent { text },
        };
        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "Webhook notification rejected");
            }
            Err(e) => {
                warn!(error = %e, "Webhook notification failed");
            }
        }
    }
}
