//! # Lakeside Bot
//!
//! The application layer of the Lakeside booking engine:
//!
//! - [`conversation`]: the per-requester booking dialogue (reducer + session store)
//! - [`moderation`]: moderator commands over the catalog and the ledger
//! - [`notifications`]: best-effort fan-out to requesters and moderators
//! - [`transport`]: logging and HTTP relay chat transports
//! - [`app`]: the inbound event router, [`BookingBot`]
//! - [`api`]: health probes, catalog queries and the chat gateway endpoint
//! - [`config`]: environment-based configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod config;
pub mod conversation;
pub mod error;
pub mod moderation;
pub mod notifications;
pub mod roster;
pub mod transport;

pub use app::{BookingBot, InboundEvent, InboundPayload, ModeratorCommand, UserIntent};
pub use config::Config;
pub use error::BotError;
pub use notifications::{DeliveryReport, NotificationDispatcher};
pub use roster::ModeratorRoster;
