use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

/// Cross-platform identity correlation for one logical conversation.
///
/// Keyed by the Telegram (bot, external chat) pair; carries the Chatwoot
/// conversation/contact ids and the Dify continuity token as they become
/// known. Created lazily on first forward, never deleted by the routing
/// engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLink {
    pub telegram_bot_id: String,
    pub external_chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatwoot_conversation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatwoot_contact_id: Option<i64>,
    /// Continuity token issued by Dify; refreshed on every reply when
    /// conversation history is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dify_conversation_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ConversationLink {
    pub fn new(telegram_bot_id: impl Into<String>, external_chat_id: impl Into<String>) -> Self {
        Self {
            telegram_bot_id: telegram_bot_id.into(),
            external_chat_id: external_chat_id.into(),
            ..Self::default()
        }
    }
}

/// Persistent storage for conversation links.
#[async_trait]
pub trait ConversationLinkStore: Send + Sync {
    async fn find(
        &self,
        telegram_bot_id: &str,
        external_chat_id: &str,
    ) -> Result<Option<ConversationLink>>;
    /// Reverse lookup for replies flowing back from the desk platform.
    async fn find_by_chatwoot_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationLink>>;
    /// Reverse lookup by the AI continuity token.
    async fn find_by_dify_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationLink>>;
    async fn upsert(&self, link: ConversationLink) -> Result<()>;
}
