use tracing::{debug, info};

use switchboard_platforms::{
    CanonicalMessage, ChatType, ConversationLink, ResolvedConversation, Result,
};

use crate::client::{ChatwootClient, Inbox, SourceAttributes};

/// Find or create the Chatwoot conversation for a canonical message.
///
/// Resolution order:
/// 1. the persisted link already carries a conversation id;
/// 2. search by `source_id` within the inbox — two racing webhook
///    deliveries for the same new conversation should converge on the one
///    the other created (best-effort: a narrow race window remains between
///    the search and the create);
/// 3. create contact + conversation with source attributes.
pub async fn resolve(
    client: &ChatwootClient,
    inbox_id: i64,
    message: &CanonicalMessage,
    link: Option<&ConversationLink>,
) -> Result<ResolvedConversation> {
    if let Some(conversation_id) = link.and_then(|l| l.chatwoot_conversation_id) {
        debug!(
            conversation_id,
            source_id = %message.conversation_id,
            "chatwoot conversation known from link"
        );
        return Ok(ResolvedConversation {
            conversation_id: conversation_id.to_string(),
            created: false,
            link: None,
        });
    }

    let mut updated = link.cloned().unwrap_or_else(|| {
        ConversationLink::new(&message.instance_id, &message.conversation_id)
    });

    if let Some(found) = client
        .find_conversation_by_source_id(inbox_id, &message.conversation_id)
        .await?
    {
        debug!(
            conversation_id = found.id,
            source_id = %message.conversation_id,
            "chatwoot conversation found by source id"
        );
        updated.chatwoot_conversation_id = Some(found.id);
        return Ok(ResolvedConversation {
            conversation_id: found.id.to_string(),
            created: false,
            link: Some(updated),
        });
    }

    let attributes = SourceAttributes {
        platform: message.origin.to_string(),
        chat_type: match message.metadata.chat_type {
            ChatType::Private => "private".into(),
            ChatType::Group => "group".into(),
        },
        username: message.metadata.username.clone(),
        language_code: message.metadata.language_code.clone(),
    };
    let display_name = message
        .sender_name
        .clone()
        .or_else(|| message.metadata.username.clone())
        .unwrap_or_else(|| message.sender_id.clone());

    let contact = client
        .create_contact(inbox_id, &display_name, &message.conversation_id, &attributes)
        .await?;
    let conversation = client
        .create_conversation(inbox_id, contact.id, &message.conversation_id, &attributes)
        .await?;

    info!(
        conversation_id = conversation.id,
        contact_id = contact.id,
        source_id = %message.conversation_id,
        "created chatwoot conversation"
    );

    updated.chatwoot_conversation_id = Some(conversation.id);
    updated.chatwoot_contact_id = Some(contact.id);
    Ok(ResolvedConversation {
        conversation_id: conversation.id.to_string(),
        created: true,
        link: Some(updated),
    })
}

/// Find an inbox by name, creating an API-channel inbox when absent.
///
/// Used when the mapping's auto-connect flag is set and the instance has no
/// inbox configured.
pub async fn ensure_inbox(client: &ChatwootClient, name: &str) -> Result<Inbox> {
    let inboxes = client.list_inboxes().await?;
    if let Some(existing) = inboxes.into_iter().find(|i| i.name == name) {
        return Ok(existing);
    }
    let created = client.create_inbox(name).await?;
    info!(inbox_id = created.id, name, "created chatwoot inbox");
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        secrecy::Secret,
        switchboard_platforms::{
            InstanceCredentials, MessageMetadata, PlatformInstance, PlatformType,
        },
    };

    use super::*;

    fn client(base_url: &str) -> ChatwootClient {
        let instance = PlatformInstance {
            id: "desk-1".into(),
            platform: PlatformType::Chatwoot,
            display_name: "Helpdesk".into(),
            credentials: InstanceCredentials {
                base_url: base_url.into(),
                token: Secret::new("cw-token".into()),
                account_id: Some("3".into()),
                ..Default::default()
            },
            is_active: true,
            created_at: 0,
            updated_at: 0,
        };
        ChatwootClient::from_instance(reqwest::Client::new(), &instance).unwrap()
    }

    fn message() -> CanonicalMessage {
        CanonicalMessage {
            origin: PlatformType::Telegram,
            instance_id: "bot-1".into(),
            conversation_id: "42".into(),
            sender_id: "42".into(),
            sender_name: Some("Ada Lovelace".into()),
            text: "hello".into(),
            metadata: MessageMetadata::default(),
        }
    }

    #[tokio::test]
    async fn known_link_skips_remote_lookup() {
        // No mocks registered: any HTTP call would fail the test.
        let server = mockito::Server::new_async().await;
        let c = client(&server.url());

        let mut link = ConversationLink::new("bot-1", "42");
        link.chatwoot_conversation_id = Some(77);

        let resolved = resolve(&c, 9, &message(), Some(&link)).await.unwrap();
        assert_eq!(resolved.conversation_id, "77");
        assert!(!resolved.created);
        assert!(resolved.link.is_none());
    }

    #[tokio::test]
    async fn search_hit_reuses_conversation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/conversations")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{"meta":{},"payload":[{"id":77}]}}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v1/accounts/3/conversations")
            .expect(0)
            .create_async()
            .await;

        let c = client(&server.url());
        let resolved = resolve(&c, 9, &message(), None).await.unwrap();
        assert_eq!(resolved.conversation_id, "77");
        assert!(!resolved.created);
        assert_eq!(
            resolved.link.and_then(|l| l.chatwoot_conversation_id),
            Some(77)
        );
        create.assert_async().await;
    }

    #[tokio::test]
    async fn search_miss_creates_contact_and_conversation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/conversations")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{"meta":{},"payload":[]}}"#)
            .create_async()
            .await;
        let contact = server
            .mock("POST", "/api/v1/accounts/3/contacts")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "inbox_id": 9,
                "name": "Ada Lovelace",
                "identifier": "42",
            })))
            .with_status(200)
            .with_body(r#"{"payload":{"contact":{"id":5}}}"#)
            .create_async()
            .await;
        let conversation = server
            .mock("POST", "/api/v1/accounts/3/conversations")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "inbox_id": 9,
                "contact_id": 5,
                "source_id": "42",
            })))
            .with_status(200)
            .with_body(r#"{"id":88}"#)
            .create_async()
            .await;

        let c = client(&server.url());
        let resolved = resolve(&c, 9, &message(), None).await.unwrap();
        assert_eq!(resolved.conversation_id, "88");
        assert!(resolved.created);
        let link = resolved.link.unwrap();
        assert_eq!(link.chatwoot_conversation_id, Some(88));
        assert_eq!(link.chatwoot_contact_id, Some(5));
        contact.assert_async().await;
        conversation.assert_async().await;
    }

    #[tokio::test]
    async fn repeat_resolution_is_idempotent() {
        use std::sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        };

        // First call creates; the second finds the conversation by source id
        // and must not create another one.
        let mut server = mockito::Server::new_async().await;
        let created = Arc::new(AtomicBool::new(false));
        let created_in_mock = Arc::clone(&created);
        server
            .mock("GET", "/api/v1/accounts/3/conversations")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body_from_request(move |_| {
                if created_in_mock.load(Ordering::SeqCst) {
                    br#"{"data":{"meta":{},"payload":[{"id":88}]}}"#.to_vec()
                } else {
                    br#"{"data":{"meta":{},"payload":[]}}"#.to_vec()
                }
            })
            .expect(2)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/accounts/3/contacts")
            .with_status(200)
            .with_body(r#"{"payload":{"contact":{"id":5}}}"#)
            .expect(1)
            .create_async()
            .await;
        let created_on_create = Arc::clone(&created);
        let create = server
            .mock("POST", "/api/v1/accounts/3/conversations")
            .with_status(200)
            .with_body_from_request(move |_| {
                created_on_create.store(true, Ordering::SeqCst);
                br#"{"id":88}"#.to_vec()
            })
            .expect(1)
            .create_async()
            .await;

        let c = client(&server.url());
        let first = resolve(&c, 9, &message(), None).await.unwrap();
        assert!(first.created);

        let second = resolve(&c, 9, &message(), None).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.conversation_id, "88");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn ensure_inbox_reuses_existing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/inboxes")
            .with_status(200)
            .with_body(r#"{"payload":[{"id":9,"name":"Support Bot","channel_type":"Channel::Api"}]}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v1/accounts/3/inboxes")
            .expect(0)
            .create_async()
            .await;

        let c = client(&server.url());
        let inbox = ensure_inbox(&c, "Support Bot").await.unwrap();
        assert_eq!(inbox.id, 9);
        create.assert_async().await;
    }
}
