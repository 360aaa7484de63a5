use {serde::Deserialize, tracing::debug};

use switchboard_platforms::{CanonicalMessage, MessageMetadata, PlatformType};

/// Inbound webhook event. Chatwoot sends one flat JSON object per event
/// with an `event` discriminator.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    /// Conversation id for `conversation_updated` events.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub conversation: Option<EventConversation>,
    #[serde(default)]
    pub sender: Option<EventSender>,
    /// Message list attached to `conversation_updated` events.
    #[serde(default)]
    pub messages: Option<Vec<EventMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventConversation {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSender {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: Option<serde_json::Value>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub sender: Option<EventSender>,
}

/// True for agent replies that should flow outward. Incoming messages are
/// echoes of content the bridge itself filed (or contact traffic on another
/// channel) and private messages are internal notes; both must stay inside
/// the desk, which is also what breaks the forward → webhook → forward loop
/// on the desk side.
fn is_forwardable(message_type: Option<&serde_json::Value>, private: Option<bool>) -> bool {
    if private.unwrap_or(false) {
        return false;
    }
    match message_type {
        // The API encodes message_type as "outgoing" in webhook payloads and
        // as 1 in conversation snapshots.
        Some(serde_json::Value::String(s)) => s == "outgoing",
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Normalize a webhook event into a canonical message.
///
/// Events that carry no actionable message (`contact_updated`, incoming
/// echoes, private notes, unrecognized event types) normalize to `None` —
/// never an error, so the webhook delivery itself always succeeds and the
/// origin platform has no reason to disable it.
pub fn normalize_event(instance_id: &str, event: &WebhookEvent) -> Option<CanonicalMessage> {
    match event.event.as_str() {
        "message_created" => {
            let message_type = event
                .message_type
                .as_ref()
                .map(|s| serde_json::Value::String(s.clone()));
            if !is_forwardable(message_type.as_ref(), event.private) {
                debug!(event = %event.event, "skipping non-forwardable chatwoot message");
                return None;
            }
            let conversation_id = event.conversation.as_ref()?.id;
            let content = event.content.as_deref()?.trim();
            if content.is_empty() {
                return None;
            }
            Some(build_message(
                instance_id,
                conversation_id,
                content,
                event.sender.as_ref(),
            ))
        },
        "conversation_updated" => {
            let conversation_id = event
                .id
                .or_else(|| event.conversation.as_ref().map(|c| c.id))?;
            let messages = event.messages.as_deref().unwrap_or_default();
            let last = messages.last()?;
            if !is_forwardable(last.message_type.as_ref(), last.private) {
                return None;
            }
            let content = last.content.as_deref()?.trim();
            if content.is_empty() {
                return None;
            }
            Some(build_message(
                instance_id,
                conversation_id,
                content,
                last.sender.as_ref(),
            ))
        },
        // Informational only; no message to route.
        "contact_updated" => None,
        other => {
            debug!(event = other, "ignoring unrecognized chatwoot event");
            None
        },
    }
}

fn build_message(
    instance_id: &str,
    conversation_id: i64,
    content: &str,
    sender: Option<&EventSender>,
) -> CanonicalMessage {
    CanonicalMessage {
        origin: PlatformType::Chatwoot,
        instance_id: instance_id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender
            .and_then(|s| s.id)
            .map(|id| id.to_string())
            .unwrap_or_default(),
        sender_name: sender.and_then(|s| s.name.clone()),
        text: content.to_string(),
        metadata: MessageMetadata::default(),
    }
}
