//! Inbound event envelope and structural routing.
//!
//! The chat transport delivers a JSON envelope with a monotonic `update_id`
//! and exactly one payload variant. The wire shape uses optional fields;
//! [`route`] converts it into the closed [`RoutedEvent`] union so the rest
//! of the pipeline can match exhaustively instead of probing options.

mod dedup;

pub use dedup::IdempotencyGuard;

use serde::{Deserialize, Serialize};

/// The raw webhook envelope as delivered by the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUpdate {
    /// Monotonic event id issued by the sender. Used for idempotency.
    pub update_id: i64,
    /// A message sent in a group or private chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<IncomingMessage>,
    /// A button press on an inline keyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    /// A post in a broadcast channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<IncomingMessage>,
    /// An edit to a previously sent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<IncomingMessage>,
}

/// A chat message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Message id within the chat.
    pub message_id: i64,
    /// Unix timestamp of the message.
    pub date: i64,
    /// Chat the message was sent in.
    pub chat: Chat,
    /// Message text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Sender, absent for channel posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Sender>,
}

/// Chat metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: i64,
    /// Chat title, for groups and channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Chat kind as reported by the transport.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Message sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    /// Sender id. Doubles as the operator id for menu sessions.
    pub id: i64,
    /// First name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A button press payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Callback query id.
    pub id: String,
    /// Who pressed the button.
    pub from: Sender,
    /// Opaque callback data attached to the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Routed event variants. Closed set; downstream code matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedEvent {
    /// A free-text message from a group or private chat.
    ChannelMessage {
        /// Chat id the message arrived in.
        chat_id: i64,
        /// Human-readable chat name.
        chat_name: String,
        /// Sender id, when the transport provided one.
        sender_id: Option<i64>,
        /// Message text.
        text: String,
    },
    /// An inline-keyboard button press.
    ButtonAction {
        /// Operator who pressed the button.
        operator_id: i64,
        /// Callback data attached to the button.
        data: String,
    },
    /// A broadcast-channel post.
    ChannelPost {
        /// Channel id.
        chat_id: i64,
        /// Channel name.
        chat_name: String,
        /// Post text.
        text: String,
    },
    /// An edited message. Dropped by the pipeline.
    EditedMessage {
        /// Chat id.
        chat_id: i64,
        /// New text.
        text: String,
    },
}

/// Classify an inbound envelope into a [`RoutedEvent`].
///
/// Routing is purely structural: it looks only at which payload fields are
/// present, never at their content. Empty-text and unroutable events yield
/// `None` and must be dropped with no side effect.
#[must_use]
pub fn route(update: &ChannelUpdate) -> Option<RoutedEvent> {
    if let Some(query) = &update.callback_query {
        let data = query.data.clone()?;
        if data.is_empty() {
            return None;
        }
        return Some(RoutedEvent::ButtonAction {
            operator_id: query.from.id,
            data,
        });
    }

    if let Some(message) = &update.message {
        let text = non_empty_text(message)?;
        return Some(RoutedEvent::ChannelMessage {
            chat_id: message.chat.id,
            chat_name: chat_name(message),
            sender_id: message.from.as_ref().map(|s| s.id),
            text,
        });
    }

    if let Some(post) = &update.channel_post {
        let text = non_empty_text(post)?;
        return Some(RoutedEvent::ChannelPost {
            chat_id: post.chat.id,
            chat_name: chat_name(post),
            text,
        });
    }

    if let Some(edited) = &update.edited_message {
        let text = non_empty_text(edited)?;
        return Some(RoutedEvent::EditedMessage {
            chat_id: edited.chat.id,
            text,
        });
    }

    None
}

fn non_empty_text(message: &IncomingMessage) -> Option<String> {
    message
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn chat_name(message: &IncomingMessage) -> String {
    if let Some(title) = &message.chat.title {
        return title.clone();
    }
    message
        .from
        .as_ref()
        .and_then(|s| s.first_name.clone())
        .unwrap_or_else(|| message.chat.id.to_string())
}
