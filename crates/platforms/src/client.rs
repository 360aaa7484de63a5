use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    Result,
    instance::PlatformInstance,
    link::ConversationLink,
    types::{CanonicalMessage, PlatformType},
};

/// Per-forward knobs resolved from the applicable mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardOptions {
    /// Create the desk inbox on first use when none is configured
    /// (the mapping's auto-connect flag).
    pub auto_create_inbox: bool,
}

/// Outcome of resolving a conversation identity on a target platform.
#[derive(Debug, Clone)]
pub struct ResolvedConversation {
    /// Target-platform conversation id (or continuity token; empty when the
    /// target starts a fresh conversation per message).
    pub conversation_id: String,
    /// A new conversation was created during resolution.
    pub created: bool,
    /// Updated link to persist, when resolution changed it.
    pub link: Option<ConversationLink>,
}

/// Result of delivering one message to a target platform.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    /// Reply text the target produced synchronously (AI platforms answer in
    /// the same call; messaging platforms return nothing).
    pub reply: Option<String>,
    /// New continuity token to persist on the conversation link.
    pub new_conversation_token: Option<String>,
}

/// Core platform capability. Each integrated platform implements this.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> PlatformType;

    /// Human-readable platform name.
    fn name(&self) -> &str;

    /// Find or create the conversation identity for a canonical message on
    /// this platform. `link` is the persisted cross-platform link, when one
    /// exists.
    async fn resolve_conversation(
        &self,
        instance: &PlatformInstance,
        options: &ForwardOptions,
        message: &CanonicalMessage,
        link: Option<&ConversationLink>,
    ) -> Result<ResolvedConversation>;

    /// Deliver a message into the resolved conversation.
    async fn send_message(
        &self,
        instance: &PlatformInstance,
        conversation: &ResolvedConversation,
        message: &CanonicalMessage,
    ) -> Result<Delivery>;

    /// Probe reachability of one configured instance.
    async fn test_connection(&self, instance: &PlatformInstance) -> Result<()>;
}

/// Registry of platform client implementations, keyed by platform type.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<PlatformType, Box<dyn PlatformClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, client: Box<dyn PlatformClient>) {
        self.clients.insert(client.platform(), client);
    }

    pub fn get(&self, platform: PlatformType) -> Option<&dyn PlatformClient> {
        self.clients.get(&platform).map(|c| c.as_ref())
    }

    pub fn list(&self) -> Vec<PlatformType> {
        self.clients.keys().copied().collect()
    }
}
