use serde::Deserialize;

use switchboard_platforms::{CanonicalMessage, ChatType, MessageMetadata, PlatformType};

/// Inbound webhook update. Only the message payload is of interest; every
/// other update kind normalizes to nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

/// Normalize an update into a canonical message.
///
/// The stable conversation id is the sender id for private chats and the
/// chat id for groups, so one Telegram user maps to one conversation
/// regardless of which message arrived first. Updates without a text
/// message normalize to `None` (no-op, never an error).
pub fn normalize_update(instance_id: &str, update: &Update) -> Option<CanonicalMessage> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    let from = message.from.as_ref()?;

    let is_private = message.chat.chat_type == "private";
    let conversation_id = if is_private {
        from.id.to_string()
    } else {
        message.chat.id.to_string()
    };

    let sender_name = match from.last_name.as_deref() {
        Some(last) => Some(format!("{} {}", from.first_name, last)),
        None => Some(from.first_name.clone()),
    };

    Some(CanonicalMessage {
        origin: PlatformType::Telegram,
        instance_id: instance_id.to_string(),
        conversation_id,
        sender_id: from.id.to_string(),
        sender_name,
        text: text.to_string(),
        metadata: MessageMetadata {
            chat_type: if is_private {
                ChatType::Private
            } else {
                ChatType::Group
            },
            username: from.username.clone(),
            language_code: from.language_code.clone(),
            is_bot: from.is_bot,
            ..Default::default()
        },
    })
}
