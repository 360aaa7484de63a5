//! Telegram platform adapter.
//!
//! Thin Bot API client over reqwest plus normalization of inbound webhook
//! updates into canonical messages.

pub mod client;
pub mod forwarder;
pub mod update;

pub use {
    client::{BotIdentity, TelegramClient, WebhookInfo},
    forwarder::TelegramForwarder,
    update::normalize_update,
};
