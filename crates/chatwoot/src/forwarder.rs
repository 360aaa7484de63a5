use std::time::Duration;

use async_trait::async_trait;

use switchboard_platforms::{
    CanonicalMessage, ConversationLink, Delivery, Error, ForwardOptions, PlatformClient,
    PlatformInstance, PlatformType, ResolvedConversation, Result,
};

use crate::{client::ChatwootClient, resolver};

/// Chatwoot implementation of the platform capability.
///
/// Forwarded messages are filed into a conversation resolved through the
/// identity resolver; the connection probe fetches the account record.
pub struct ChatwootForwarder {
    http: reqwest::Client,
}

impl ChatwootForwarder {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { http })
    }

    fn client(&self, instance: &PlatformInstance) -> Result<ChatwootClient> {
        ChatwootClient::from_instance(self.http.clone(), instance)
    }

    async fn inbox_id(
        &self,
        client: &ChatwootClient,
        instance: &PlatformInstance,
        options: &ForwardOptions,
    ) -> Result<i64> {
        if let Some(id) = instance.credentials.inbox_id {
            return Ok(id);
        }
        if options.auto_create_inbox {
            let inbox = resolver::ensure_inbox(client, &instance.display_name).await?;
            return Ok(inbox.id);
        }
        Err(Error::not_configured(
            PlatformType::Chatwoot,
            format!(
                "instance '{}' has no inbox and auto-connect is off",
                instance.id
            ),
        ))
    }
}

#[async_trait]
impl PlatformClient for ChatwootForwarder {
    fn platform(&self) -> PlatformType {
        PlatformType::Chatwoot
    }

    fn name(&self) -> &str {
        "Chatwoot"
    }

    async fn resolve_conversation(
        &self,
        instance: &PlatformInstance,
        options: &ForwardOptions,
        message: &CanonicalMessage,
        link: Option<&ConversationLink>,
    ) -> Result<ResolvedConversation> {
        if message.origin == PlatformType::Chatwoot {
            return Ok(ResolvedConversation {
                conversation_id: message.conversation_id.clone(),
                created: false,
                link: None,
            });
        }
        let client = self.client(instance)?;
        let inbox_id = self.inbox_id(&client, instance, options).await?;
        resolver::resolve(&client, inbox_id, message, link).await
    }

    async fn send_message(
        &self,
        instance: &PlatformInstance,
        conversation: &ResolvedConversation,
        message: &CanonicalMessage,
    ) -> Result<Delivery> {
        let conversation_id: i64 = conversation.conversation_id.parse().map_err(|_| {
            Error::invalid_input(format!(
                "chatwoot conversation id is not numeric: {}",
                conversation.conversation_id
            ))
        })?;
        // Messages forwarded into the desk render as the contact speaking.
        // AI answers are filed as private notes: agents see them, and the
        // desk never emits an outgoing-message webhook for them, which would
        // re-deliver an answer the chat side already received.
        let (message_type, private) = if message.origin == PlatformType::Dify {
            ("outgoing", true)
        } else {
            ("incoming", false)
        };
        self.client(instance)?
            .create_message(conversation_id, &message.text, message_type, private)
            .await?;
        Ok(Delivery::default())
    }

    async fn test_connection(&self, instance: &PlatformInstance) -> Result<()> {
        self.client(instance)?.get_account().await.map(|_| ())
    }
}
