use serde::{Deserialize, Serialize};

use switchboard_platforms::PlatformType;

/// Per-direction forward enablement. Six independent flags; a disabled
/// direction suppresses that leg even when a mapping exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionMatrix {
    pub telegram_to_chatwoot: bool,
    pub telegram_to_dify: bool,
    pub chatwoot_to_telegram: bool,
    pub chatwoot_to_dify: bool,
    pub dify_to_telegram: bool,
    pub dify_to_chatwoot: bool,
}

impl Default for DirectionMatrix {
    fn default() -> Self {
        // Source→target legs and the reply legs back to the chat are on by
        // default; cross legs between desk and AI are opt-in.
        Self {
            telegram_to_chatwoot: true,
            telegram_to_dify: true,
            chatwoot_to_telegram: true,
            chatwoot_to_dify: false,
            dify_to_telegram: true,
            dify_to_chatwoot: false,
        }
    }
}

/// Auto-provisioning flags: create the missing counterpart (Chatwoot inbox,
/// Dify session) on first forward instead of requiring manual setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoConnect {
    pub telegram_chatwoot: bool,
    pub telegram_dify: bool,
}

/// An administrator-defined routing rule.
///
/// Unique per (source instance, chatwoot instance, dify instance) triple
/// while active; soft-deactivated, never hard-deleted, so historical routing
/// stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMapping {
    pub id: String,
    /// Source platform kind. Telegram today; stored so other sources can be
    /// added without a schema change.
    pub source_platform: PlatformType,
    pub source_instance_id: String,
    pub chatwoot_instance_id: Option<String>,
    pub dify_instance_id: Option<String>,
    pub directions: DirectionMatrix,
    pub auto_connect: AutoConnect,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PlatformMapping {
    /// A mapping with no target routes nothing and is rejected at creation.
    pub fn has_target(&self) -> bool {
        self.chatwoot_instance_id.is_some() || self.dify_instance_id.is_some()
    }

    pub fn references(&self, instance_id: &str) -> bool {
        self.source_instance_id == instance_id
            || self.chatwoot_instance_id.as_deref() == Some(instance_id)
            || self.dify_instance_id.as_deref() == Some(instance_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn matrix_defaults() {
        let m: DirectionMatrix = serde_json::from_str("{}").unwrap();
        assert!(m.telegram_to_chatwoot);
        assert!(m.telegram_to_dify);
        assert!(m.chatwoot_to_telegram);
        assert!(!m.chatwoot_to_dify);
        assert!(m.dify_to_telegram);
        assert!(!m.dify_to_chatwoot);
    }

    #[test]
    fn partial_matrix_overrides_only_named_flags() {
        let m: DirectionMatrix =
            serde_json::from_str(r#"{"chatwoot_to_telegram":false}"#).unwrap();
        assert!(!m.chatwoot_to_telegram);
        assert!(m.telegram_to_chatwoot);
    }
}
