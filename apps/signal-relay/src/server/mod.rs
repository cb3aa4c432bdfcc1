//! HTTP surface: inbound webhook and read-only status endpoints.

mod http;

pub use http::{AppState, WebhookAck, WebhookStatus, create_router};
