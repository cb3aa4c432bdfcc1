//! Outbound status notifications to the execution chat group.
//!
//! Fire-and-forget from the pipeline's perspective: a failed notification
//! is logged and never propagated.

pub mod format;

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One button on an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    /// Button label.
    pub text: String,
    /// Opaque data delivered back in the button-press callback.
    pub callback_data: String,
}

impl InlineButton {
    /// Convenience constructor.
    #[must_use]
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard layout: rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    /// Button rows.
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

/// A rendered message headed for the chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingView {
    /// Message text (chat markdown).
    pub text: String,
    /// Optional reply controls.
    pub keyboard: Option<InlineKeyboard>,
}

impl OutgoingView {
    /// A plain text view.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// A view with reply controls.
    #[must_use]
    pub fn with_keyboard(text: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a view to the execution group. Must not fail the caller.
    async fn send_view(&self, view: &OutgoingView);

    /// Deliver a plain text message.
    async fn send(&self, text: &str) {
        self.send_view(&OutgoingView::text(text)).await;
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn send_view(&self, view: &OutgoingView) {
        (**self).send_view(view).await;
    }
}

/// Message body for the chat API `sendMessage` call.
#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

/// Notifier that posts to the chat bot API over HTTP.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: i64,
}

impl ChannelNotifier {
    /// Create a notifier for the given bot and execution group.
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: i64,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send_view(&self, view: &OutgoingView) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessageBody {
            chat_id: self.chat_id,
            text: &view.text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
            reply_markup: view.keyboard.as_ref(),
        };

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(chat_id = self.chat_id, "Notification sent");
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    "Notification rejected by chat API"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notification delivery failed");
            }
        }
    }
}

/// Notifier that records messages in memory. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    views: Mutex<Vec<OutgoingView>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every view sent so far.
    #[must_use]
    pub fn views(&self) -> Vec<OutgoingView> {
        self.views.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Message texts sent so far.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.views().into_iter().map(|v| v.text).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_view(&self, view: &OutgoingView) {
        if let Ok(mut views) = self.views.lock() {
            views.push(view.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recorder_captures_views() {
        let notifier = RecordingNotifier::new();
        notifier.send("hello").await;
        notifier
            .send_view(&OutgoingView::with_keyboard(
                "pick one",
                InlineKeyboard {
                    inline_keyboard: vec![vec![InlineButton::new("Yes", "yes")]],
                },
            ))
            .await;

        let views = notifier.views();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].text, "hello");
        assert!(views[1].keyboard.is_some());
    }

    #[test]
    fn keyboard_serializes_to_wire_shape() {
        let kb = InlineKeyboard {
            inline_keyboard: vec![vec![InlineButton::new("Confirm", "exec:confirm")]],
        };
        let json = serde_json::to_value(&kb).unwrap();
        assert_eq!(
            json["inline_keyboard"][0][0]["callback_data"],
            "exec:confirm"
        );
    }
}
