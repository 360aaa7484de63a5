use std::time::Duration;

use {async_trait::async_trait, tracing::debug};

use switchboard_platforms::{
    CanonicalMessage, ConversationLink, Delivery, Error, ForwardOptions, PlatformClient,
    PlatformInstance, PlatformType, ResolvedConversation, Result,
};

use crate::client::TelegramClient;

/// Telegram implementation of the platform capability.
///
/// Telegram is the origin platform for most traffic; as a forward target it
/// delivers agent/AI replies back into the chat the conversation link points
/// at.
pub struct TelegramForwarder {
    http: reqwest::Client,
}

impl TelegramForwarder {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http })
    }

    fn client(&self, instance: &PlatformInstance) -> Result<TelegramClient> {
        TelegramClient::from_instance(self.http.clone(), instance)
    }
}

#[async_trait]
impl PlatformClient for TelegramForwarder {
    fn platform(&self) -> PlatformType {
        PlatformType::Telegram
    }

    fn name(&self) -> &str {
        "Telegram"
    }

    async fn resolve_conversation(
        &self,
        _instance: &PlatformInstance,
        _options: &ForwardOptions,
        message: &CanonicalMessage,
        link: Option<&ConversationLink>,
    ) -> Result<ResolvedConversation> {
        // Telegram chats always pre-exist; resolution is identity for
        // Telegram-origin traffic and a link lookup for replies flowing back.
        let conversation_id = if message.origin == PlatformType::Telegram {
            message.conversation_id.clone()
        } else {
            link.map(|l| l.external_chat_id.clone()).ok_or_else(|| {
                Error::invalid_input(format!(
                    "no linked telegram chat for {} conversation {}",
                    message.origin, message.conversation_id
                ))
            })?
        };
        Ok(ResolvedConversation {
            conversation_id,
            created: false,
            link: None,
        })
    }

    async fn send_message(
        &self,
        instance: &PlatformInstance,
        conversation: &ResolvedConversation,
        message: &CanonicalMessage,
    ) -> Result<Delivery> {
        debug!(
            instance_id = %instance.id,
            chat_id = %conversation.conversation_id,
            origin = %message.origin,
            "delivering message to telegram chat"
        );
        self.client(instance)?
            .send_message(&conversation.conversation_id, &message.text, None)
            .await?;
        Ok(Delivery::default())
    }

    async fn test_connection(&self, instance: &PlatformInstance) -> Result<()> {
        self.client(instance)?.get_me().await.map(|_| ())
    }
}
