use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    switchboard_mappings::{MappingStore, PlatformMapping},
    switchboard_platforms::{
        CanonicalMessage, ClientRegistry, ConversationLink, ConversationLinkStore, Delivery,
        ForwardOptions, InstanceDirectory, MessageMetadata, PlatformInstance, PlatformType,
    },
};

use crate::{
    Result,
    outcome::{RoutingOutcome, TargetResult},
};

/// Fans a canonical message out to its mapped targets.
///
/// Legs run in order — the desk before the AI, so the human-facing surface
/// is attempted first — and each leg is isolated: its failure is recorded
/// on the outcome and the remaining legs still run.
pub struct RoutingEngine {
    mappings: Arc<dyn MappingStore>,
    instances: Arc<InstanceDirectory>,
    registry: Arc<ClientRegistry>,
    links: Arc<dyn ConversationLinkStore>,
}

impl RoutingEngine {
    pub fn new(
        mappings: Arc<dyn MappingStore>,
        instances: Arc<InstanceDirectory>,
        registry: Arc<ClientRegistry>,
        links: Arc<dyn ConversationLinkStore>,
    ) -> Self {
        Self {
            mappings,
            instances,
            registry,
            links,
        }
    }

    /// Route one canonical message. The caller is expected to have run
    /// [`crate::guard::should_process_message`] first.
    pub async fn route(&self, message: &CanonicalMessage) -> Result<RoutingOutcome> {
        let mappings = self
            .mappings
            .list_active_for_instance(&message.instance_id)
            .await?
            .into_iter()
            .filter(|m| Self::role_matches(m, message))
            .collect::<Vec<_>>();

        if mappings.is_empty() {
            debug!(
                origin = %message.origin,
                instance_id = %message.instance_id,
                "no route configured"
            );
            return Ok(RoutingOutcome::no_op());
        }

        let mut link = self.find_link(message).await?;
        if link.is_none() {
            // Seed the link so downstream legs and AI replies can correlate;
            // it is only persisted once a resolver fills in a counterpart.
            link = match message.origin {
                PlatformType::Telegram => Some(ConversationLink::new(
                    &message.instance_id,
                    &message.conversation_id,
                )),
                PlatformType::Chatwoot => {
                    message.conversation_id.parse::<i64>().ok().map(|id| {
                        let mut seed = ConversationLink::new("", "");
                        seed.chatwoot_conversation_id = Some(id);
                        seed
                    })
                },
                PlatformType::Dify => None,
            };
        }

        let mut results = Vec::new();
        for mapping in &mappings {
            for (platform, instance) in self.legs_for(mapping, message).await? {
                let leg_results = self
                    .forward_leg(mapping, platform, &instance, message, &mut link)
                    .await;
                results.extend(leg_results);
            }
        }

        let outcome = RoutingOutcome::from_results(results);
        info!(
            origin = %message.origin,
            instance_id = %message.instance_id,
            forwarded = outcome.forwarded,
            legs = outcome.results.len(),
            "routed message"
        );
        Ok(outcome)
    }

    /// A mapping only applies when the receiving instance plays the role the
    /// message origin implies.
    fn role_matches(mapping: &PlatformMapping, message: &CanonicalMessage) -> bool {
        let id = message.instance_id.as_str();
        match message.origin {
            PlatformType::Telegram => mapping.source_instance_id == id,
            PlatformType::Chatwoot => mapping.chatwoot_instance_id.as_deref() == Some(id),
            PlatformType::Dify => mapping.dify_instance_id.as_deref() == Some(id),
        }
    }

    async fn find_link(
        &self,
        message: &CanonicalMessage,
    ) -> anyhow::Result<Option<ConversationLink>> {
        match message.origin {
            PlatformType::Telegram => {
                self.links
                    .find(&message.instance_id, &message.conversation_id)
                    .await
            },
            PlatformType::Chatwoot => match message.conversation_id.parse::<i64>() {
                Ok(id) => self.links.find_by_chatwoot_conversation(id).await,
                Err(_) => Ok(None),
            },
            PlatformType::Dify => {
                self.links
                    .find_by_dify_conversation(&message.conversation_id)
                    .await
            },
        }
    }

    /// Targets for one mapping, direction matrix applied, inactive or
    /// missing instances dropped. The desk leg is listed before the AI leg.
    async fn legs_for(
        &self,
        mapping: &PlatformMapping,
        message: &CanonicalMessage,
    ) -> anyhow::Result<Vec<(PlatformType, PlatformInstance)>> {
        let d = &mapping.directions;
        let mut candidates: Vec<(PlatformType, Option<&str>)> = Vec::new();
        match message.origin {
            PlatformType::Telegram => {
                if d.telegram_to_chatwoot {
                    candidates
                        .push((PlatformType::Chatwoot, mapping.chatwoot_instance_id.as_deref()));
                }
                if d.telegram_to_dify {
                    candidates.push((PlatformType::Dify, mapping.dify_instance_id.as_deref()));
                }
            },
            PlatformType::Chatwoot => {
                if d.chatwoot_to_telegram {
                    candidates
                        .push((PlatformType::Telegram, Some(mapping.source_instance_id.as_str())));
                }
                if d.chatwoot_to_dify {
                    candidates.push((PlatformType::Dify, mapping.dify_instance_id.as_deref()));
                }
            },
            PlatformType::Dify => {
                if d.dify_to_telegram {
                    candidates
                        .push((PlatformType::Telegram, Some(mapping.source_instance_id.as_str())));
                }
                if d.dify_to_chatwoot {
                    candidates
                        .push((PlatformType::Chatwoot, mapping.chatwoot_instance_id.as_deref()));
                }
            },
        }

        let mut legs = Vec::new();
        for (platform, instance_id) in candidates {
            let Some(instance_id) = instance_id else {
                continue;
            };
            match self.instances.get_active(instance_id).await? {
                Some(instance) => legs.push((platform, instance)),
                None => {
                    debug!(
                        mapping_id = %mapping.id,
                        %platform,
                        instance_id,
                        "dropping leg: target instance missing or inactive"
                    );
                },
            }
        }
        Ok(legs)
    }

    /// Execute one leg and, for AI targets, deliver the synchronous answer
    /// onward per the direction matrix. Errors become failed results; they
    /// never propagate.
    async fn forward_leg(
        &self,
        mapping: &PlatformMapping,
        platform: PlatformType,
        instance: &PlatformInstance,
        message: &CanonicalMessage,
        link: &mut Option<ConversationLink>,
    ) -> Vec<TargetResult> {
        let mut results = Vec::new();
        match self.deliver(mapping, platform, instance, message, link).await {
            Ok(delivery) => {
                results.push(TargetResult::ok(platform, &instance.id));
                if let Some(reply) = delivery.reply {
                    self.route_reply(mapping, instance, message, reply, link, &mut results)
                        .await;
                }
            },
            Err(e) => {
                warn!(
                    mapping_id = %mapping.id,
                    %platform,
                    instance_id = %instance.id,
                    error = %e,
                    "forward leg failed"
                );
                results.push(TargetResult::failed(platform, &instance.id, e));
            },
        }
        results
    }

    /// Resolve the target conversation, deliver, and persist link changes.
    async fn deliver(
        &self,
        mapping: &PlatformMapping,
        platform: PlatformType,
        instance: &PlatformInstance,
        message: &CanonicalMessage,
        link: &mut Option<ConversationLink>,
    ) -> anyhow::Result<Delivery> {
        let client = self
            .registry
            .get(platform)
            .ok_or_else(|| anyhow::anyhow!("no client registered for {platform}"))?;
        let options = ForwardOptions {
            auto_create_inbox: mapping.auto_connect.telegram_chatwoot,
        };

        let resolved = client
            .resolve_conversation(instance, &options, message, link.as_ref())
            .await?;
        if let Some(updated) = resolved.link.clone() {
            self.persist_link(&updated).await?;
            *link = Some(updated);
        }

        let delivery = client.send_message(instance, &resolved, message).await?;

        if let Some(token) = delivery.new_conversation_token.as_deref()
            && let Some(l) = link.as_mut()
            && l.dify_conversation_id.as_deref() != Some(token)
        {
            l.dify_conversation_id = Some(token.to_string());
            self.persist_link(l).await?;
        }
        Ok(delivery)
    }

    /// Upsert a link, skipping seeds that never gained a Telegram key —
    /// the store is keyed by (bot, chat) and cannot file them.
    async fn persist_link(&self, link: &ConversationLink) -> anyhow::Result<()> {
        if link.telegram_bot_id.is_empty() {
            return Ok(());
        }
        self.links.upsert(link.clone()).await
    }

    /// Deliver an AI answer back toward the chat and/or into the desk,
    /// depending on the matrix. Single pass — the answer never re-enters
    /// [`Self::route`].
    async fn route_reply(
        &self,
        mapping: &PlatformMapping,
        ai_instance: &PlatformInstance,
        original: &CanonicalMessage,
        reply: String,
        link: &mut Option<ConversationLink>,
        results: &mut Vec<TargetResult>,
    ) {
        let reply_message = CanonicalMessage {
            origin: PlatformType::Dify,
            instance_id: ai_instance.id.clone(),
            conversation_id: original.conversation_id.clone(),
            sender_id: original.sender_id.clone(),
            sender_name: Some(ai_instance.display_name.clone()),
            text: reply,
            metadata: MessageMetadata {
                chat_type: original.metadata.chat_type,
                forwarded: true,
                ..Default::default()
            },
        };

        let mut reply_targets: Vec<(PlatformType, &str)> = Vec::new();
        if mapping.directions.dify_to_telegram {
            // A desk-origin question only gets its answer in the chat when
            // the desk→chat leg itself is allowed.
            let allowed = original.origin != PlatformType::Chatwoot
                || mapping.directions.chatwoot_to_telegram;
            if allowed {
                reply_targets.push((PlatformType::Telegram, mapping.source_instance_id.as_str()));
            }
        }
        if mapping.directions.dify_to_chatwoot
            && let Some(desk) = mapping.chatwoot_instance_id.as_deref()
        {
            reply_targets.push((PlatformType::Chatwoot, desk));
        }

        for (platform, instance_id) in reply_targets {
            let instance = match self.instances.get_active(instance_id).await {
                Ok(Some(instance)) => instance,
                Ok(None) => {
                    results.push(TargetResult::failed(
                        platform,
                        instance_id,
                        "reply target instance missing or inactive",
                    ));
                    continue;
                },
                Err(e) => {
                    results.push(TargetResult::failed(platform, instance_id, e));
                    continue;
                },
            };
            match self
                .deliver(mapping, platform, &instance, &reply_message, link)
                .await
            {
                Ok(_) => results.push(TargetResult::ok(platform, &instance.id)),
                Err(e) => {
                    warn!(
                        mapping_id = %mapping.id,
                        %platform,
                        instance_id = %instance.id,
                        error = %e,
                        "reply delivery failed"
                    );
                    results.push(TargetResult::failed(platform, &instance.id, e));
                },
            }
        }
    }
}
