use std::sync::Arc;

use tracing::debug;

use switchboard_platforms::PlatformType;

use crate::{
    Error, Result,
    engine::RoutingEngine,
    guard::should_process_message,
    outcome::RoutingOutcome,
};

/// Entry point invoked once per inbound webhook.
///
/// Normalizes the platform-specific payload into a canonical message and
/// hands it to the engine. Events that carry no actionable message produce
/// the no-op outcome — a webhook delivery must only fail when the payload
/// is structurally invalid, otherwise the origin platform will eventually
/// disable the webhook.
pub struct MessageBroker {
    engine: Arc<RoutingEngine>,
}

impl MessageBroker {
    pub fn new(engine: Arc<RoutingEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle(
        &self,
        origin: PlatformType,
        instance_id: &str,
        raw: serde_json::Value,
    ) -> Result<RoutingOutcome> {
        let message = match origin {
            PlatformType::Telegram => {
                let update: switchboard_telegram::update::Update = serde_json::from_value(raw)
                    .map_err(|source| Error::InvalidPayload { origin, source })?;
                switchboard_telegram::normalize_update(instance_id, &update)
            },
            PlatformType::Chatwoot => {
                let event: switchboard_chatwoot::webhook::WebhookEvent =
                    serde_json::from_value(raw)
                        .map_err(|source| Error::InvalidPayload { origin, source })?;
                switchboard_chatwoot::normalize_event(instance_id, &event)
            },
            PlatformType::Dify => return Err(Error::UnsupportedOrigin(origin)),
        };

        let Some(message) = message else {
            debug!(%origin, instance_id, "webhook event carries no routable message");
            return Ok(RoutingOutcome::no_op());
        };
        if !should_process_message(&message) {
            return Ok(RoutingOutcome::no_op());
        }
        self.engine.route(&message).await
    }
}
