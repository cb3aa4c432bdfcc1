// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Signal Relay - signal-to-trade execution pipeline.
//!
//! An event-driven subsystem that receives trade signals from a chat
//! channel and an interactive button menu, validates and scores them,
//! converts them into risk-bounded orders, dispatches those orders to a
//! broker bridge, and keeps a durable, queryable trade journal.
//!
//! # Flow
//!
//! ```text
//! webhook -> dedup -> route -+-> parse -> score -> gates -+
//!                            |                            +-> risk -> guard -> bridge -> journal -> notify
//!                            +-> menu state machine ------+
//! ```
//!
//! # Modules
//!
//! - [`events`]: inbound envelope, structural router, idempotency guard
//! - [`signal`]: alert parser, validator, confidence scorer
//! - [`menu`]: interactive order builder (per-operator state machine)
//! - [`risk`]: price re-validation, risk-reward gate, position sizing
//! - [`broker`] / [`execution`]: bridge REST client and execution gateway
//! - [`journal`]: durable ledger, statistics, CSV/JSONL exports
//! - [`notifier`]: outbound chat notifications
//! - [`server`]: axum webhook and status endpoints
//! - [`pipeline`]: the orchestration tying it all together

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Broker bridge REST client.
pub mod broker;

/// Environment-based configuration.
pub mod config;

/// Inbound events: envelope, router, idempotency guard.
pub mod events;

/// Execution gateway and open-trade concurrency guard.
pub mod execution;

/// Durable trade ledger.
pub mod journal;

/// Interactive order builder.
pub mod menu;

/// Core data types.
pub mod models;

/// Outbound notifications.
pub mod notifier;

/// Pipeline orchestration.
pub mod pipeline;

/// Risk engine.
pub mod risk;

/// HTTP surface.
pub mod server;

/// Alert parsing, validation and scoring.
pub mod signal;

pub use config::Config;
pub use pipeline::Pipeline;
pub use server::{AppState, create_router};
