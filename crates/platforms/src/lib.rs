//! Platform capability layer.
//!
//! Each integrated platform (Telegram, Chatwoot, Dify) implements the
//! [`PlatformClient`] trait; the routing engine selects implementations
//! through a [`ClientRegistry`] keyed by [`PlatformType`], so adding a
//! platform means adding an implementation, not editing a branch.

pub mod client;
pub mod error;
pub mod instance;
pub mod link;
pub mod types;

pub use {
    client::{ClientRegistry, Delivery, ForwardOptions, PlatformClient, ResolvedConversation},
    error::{Error, Result},
    instance::{InstanceCredentials, InstanceDirectory, InstanceStore, PlatformInstance},
    link::{ConversationLink, ConversationLinkStore},
    types::{CanonicalMessage, ChatType, MessageMetadata, PlatformType},
};
