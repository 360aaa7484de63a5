use std::time::Duration;

use async_trait::async_trait;

use switchboard_platforms::{
    CanonicalMessage, ConversationLink, Delivery, ForwardOptions, PlatformClient,
    PlatformInstance, PlatformType, ResolvedConversation, Result,
};

use crate::{client::DifyClient, shaping, shaping::ShapingConfig};

/// Product-level Dify behavior, set by the administrator.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DifyOptions {
    /// Attach the continuity token so the app accumulates context. Off by
    /// default: stateless turns keep answers predictable and bound cost.
    pub enable_conversation_history: bool,
    pub shaping: ShapingConfig,
}

/// Dify implementation of the platform capability.
///
/// "Sending" to the AI platform is a query: the answer comes back in the
/// same call and is surfaced on the [`Delivery`] for the engine to route.
pub struct DifyForwarder {
    http: reqwest::Client,
    options: DifyOptions,
}

impl DifyForwarder {
    pub fn new(options: DifyOptions) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, options })
    }

    fn client(&self, instance: &PlatformInstance) -> Result<DifyClient> {
        DifyClient::from_instance(self.http.clone(), instance)
    }
}

#[async_trait]
impl PlatformClient for DifyForwarder {
    fn platform(&self) -> PlatformType {
        PlatformType::Dify
    }

    fn name(&self) -> &str {
        "Dify"
    }

    async fn resolve_conversation(
        &self,
        _instance: &PlatformInstance,
        _options: &ForwardOptions,
        _message: &CanonicalMessage,
        link: Option<&ConversationLink>,
    ) -> Result<ResolvedConversation> {
        // With history disabled every turn is fresh; the empty id means "no
        // continuity token".
        let conversation_id = if self.options.enable_conversation_history {
            link.and_then(|l| l.dify_conversation_id.clone())
                .unwrap_or_default()
        } else {
            String::new()
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
        let user = if message.sender_id.is_empty() {
            message.conversation_id.clone()
        } else {
            message.sender_id.clone()
        };
        let token = (!conversation.conversation_id.is_empty())
            .then_some(conversation.conversation_id.as_str());

        let answer = self
            .client(instance)?
            .send_chat_message(&message.text, token, &user)
            .await?;
        let reply = shaping::shape_answer(&self.options.shaping, &message.text, &answer.answer);

        Ok(Delivery {
            reply: Some(reply),
            new_conversation_token: if self.options.enable_conversation_history {
                answer.conversation_id
            } else {
                None
            },
        })
    }

    async fn test_connection(&self, instance: &PlatformInstance) -> Result<()> {
        // Lightweight completion call; proves the key and app are live.
        self.client(instance)?
            .send_chat_message("ping", None, "connection-test")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        secrecy::Secret,
        switchboard_platforms::{InstanceCredentials, MessageMetadata},
    };

    use super::*;

    fn instance(base_url: &str) -> PlatformInstance {
        PlatformInstance {
            id: "ai-1".into(),
            platform: PlatformType::Dify,
            display_name: "Support AI".into(),
            credentials: InstanceCredentials {
                base_url: base_url.into(),
                token: Secret::new("app-key".into()),
                app_id: Some("app-1".into()),
                ..Default::default()
            },
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn message(text: &str) -> CanonicalMessage {
        CanonicalMessage {
            origin: PlatformType::Telegram,
            instance_id: "bot-1".into(),
            conversation_id: "42".into(),
            sender_id: "42".into(),
            sender_name: Some("Ada".into()),
            text: text.into(),
            metadata: MessageMetadata::default(),
        }
    }

    #[tokio::test]
    async fn stateless_mode_never_attaches_token() {
        let forwarder = DifyForwarder::new(DifyOptions::default()).unwrap();
        let mut link = ConversationLink::new("bot-1", "42");
        link.dify_conversation_id = Some("conv-9".into());

        let resolved = forwarder
            .resolve_conversation(
                &instance("http://localhost"),
                &ForwardOptions::default(),
                &message("hello"),
                Some(&link),
            )
            .await
            .unwrap();
        assert!(resolved.conversation_id.is_empty());
    }

    #[tokio::test]
    async fn history_mode_reuses_and_refreshes_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat-messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "conversation_id": "conv-9",
            })))
            .with_status(200)
            .with_body(r#"{"answer":"sure","conversation_id":"conv-10"}"#)
            .create_async()
            .await;

        let forwarder = DifyForwarder::new(DifyOptions {
            enable_conversation_history: true,
            ..Default::default()
        })
        .unwrap();
        let mut link = ConversationLink::new("bot-1", "42");
        link.dify_conversation_id = Some("conv-9".into());

        let inst = instance(&server.url());
        let resolved = forwarder
            .resolve_conversation(&inst, &ForwardOptions::default(), &message("more"), Some(&link))
            .await
            .unwrap();
        assert_eq!(resolved.conversation_id, "conv-9");

        let delivery = forwarder
            .send_message(&inst, &resolved, &message("more"))
            .await
            .unwrap();
        assert_eq!(delivery.reply.as_deref(), Some("sure"));
        assert_eq!(delivery.new_conversation_token.as_deref(), Some("conv-10"));
    }

    #[tokio::test]
    async fn answer_is_shaped_before_delivery() {
        let mut server = mockito::Server::new_async().await;
        let long_answer = "a".repeat(300);
        server
            .mock("POST", "/chat-messages")
            .with_status(200)
            .with_body(format!(r#"{{"answer":"{long_answer}"}}"#))
            .create_async()
            .await;

        let forwarder = DifyForwarder::new(DifyOptions {
            shaping: ShapingConfig {
                simple_greeting_max_len: 200,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let inst = instance(&server.url());
        let resolved = forwarder
            .resolve_conversation(&inst, &ForwardOptions::default(), &message("hi"), None)
            .await
            .unwrap();
        let delivery = forwarder
            .send_message(&inst, &resolved, &message("hi"))
            .await
            .unwrap();
        let reply = delivery.reply.unwrap();
        assert_eq!(reply.len(), 203);
        assert!(reply.ends_with("..."));
    }
}
