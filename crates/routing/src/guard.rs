use {switchboard_platforms::CanonicalMessage, tracing::debug};

/// Pre-routing check, run before any mapping lookup.
///
/// Rejects messages that must never re-enter the engine: anything a forward
/// produced (`forwarded`), traffic from other bots (`is_bot`), and
/// connection-test messages (`test_mode`). This is what breaks the
/// forward → webhook → forward cycle.
pub fn should_process_message(message: &CanonicalMessage) -> bool {
    if message.metadata.forwarded {
        debug!(
            origin = %message.origin,
            conversation = %message.conversation_id,
            "skipping already-forwarded message"
        );
        return false;
    }
    if message.metadata.is_bot {
        debug!(
            origin = %message.origin,
            sender = %message.sender_id,
            "skipping message from a bot sender"
        );
        return false;
    }
    if message.metadata.test_mode {
        return false;
    }
    !message.text.trim().is_empty()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use switchboard_platforms::{MessageMetadata, PlatformType};

    use super::*;

    fn message(metadata: MessageMetadata) -> CanonicalMessage {
        CanonicalMessage {
            origin: PlatformType::Telegram,
            instance_id: "bot-1".into(),
            conversation_id: "42".into(),
            sender_id: "42".into(),
            sender_name: None,
            text: "hello".into(),
            metadata,
        }
    }

    #[test]
    fn plain_message_passes() {
        assert!(should_process_message(&message(MessageMetadata::default())));
    }

    #[test]
    fn forwarded_flag_rejects() {
        let meta = MessageMetadata {
            forwarded: true,
            ..Default::default()
        };
        assert!(!should_process_message(&message(meta)));
    }

    #[test]
    fn bot_sender_rejects() {
        let meta = MessageMetadata {
            is_bot: true,
            ..Default::default()
        };
        assert!(!should_process_message(&message(meta)));
    }

    #[test]
    fn test_mode_rejects() {
        let meta = MessageMetadata {
            test_mode: true,
            ..Default::default()
        };
        assert!(!should_process_message(&message(meta)));
    }

    #[test]
    fn blank_text_rejects() {
        let mut msg = message(MessageMetadata::default());
        msg.text = "   ".into();
        assert!(!should_process_message(&msg));
    }
}
