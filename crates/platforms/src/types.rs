use serde::{Deserialize, Serialize};

/// The three integrated platform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Telegram,
    Chatwoot,
    Dify,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Chatwoot => "chatwoot",
            Self::Dify => "dify",
        }
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlatformType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(Self::Telegram),
            "chatwoot" => Ok(Self::Chatwoot),
            "dify" => Ok(Self::Dify),
            other => Err(crate::Error::invalid_input(format!(
                "unknown platform type: {other}"
            ))),
        }
    }
}

/// Kind of chat a message originated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    #[default]
    Private,
    Group,
}

/// Per-platform metadata attached to a canonical message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMetadata {
    pub chat_type: ChatType,
    pub username: Option<String>,
    pub language_code: Option<String>,
    /// Sender is a bot account on the origin platform.
    pub is_bot: bool,
    /// Message was produced by a forward and must not be routed again.
    pub forwarded: bool,
    /// Message belongs to a connection test, not a real conversation.
    pub test_mode: bool,
    /// Remaining platform-specific fields, passed through untouched.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Platform-agnostic envelope produced by normalizing a raw webhook payload.
///
/// Ephemeral: lives for one webhook invocation, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub origin: PlatformType,
    /// The configured platform instance that received the webhook. Raw
    /// payloads do not self-identify, so the broker attaches this.
    pub instance_id: String,
    /// Stable external conversation id on the origin platform.
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn platform_type_roundtrip() {
        for (s, p) in [
            ("telegram", PlatformType::Telegram),
            ("chatwoot", PlatformType::Chatwoot),
            ("dify", PlatformType::Dify),
        ] {
            assert_eq!(s.parse::<PlatformType>().unwrap(), p);
            assert_eq!(p.as_str(), s);
        }
        assert!("slack".parse::<PlatformType>().is_err());
    }

    #[test]
    fn metadata_defaults() {
        let meta: MessageMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.chat_type, ChatType::Private);
        assert!(!meta.forwarded);
        assert!(!meta.is_bot);
        assert!(!meta.test_mode);
    }
}
