//! Chatwoot platform adapter.
//!
//! API client, the conversation identity resolver (find-by-source-id before
//! create), and normalization of inbound webhook events.

pub mod client;
pub mod forwarder;
pub mod resolver;
pub mod webhook;

pub use {
    client::{Account, ChatwootClient, Contact, Conversation, Inbox},
    forwarder::ChatwootForwarder,
    webhook::normalize_event,
};
