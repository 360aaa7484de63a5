use std::sync::Arc;

use {
    serde::Serialize,
    tracing::{info, warn},
};

use {
    switchboard_common::unix_now,
    switchboard_platforms::{ClientRegistry, InstanceDirectory, PlatformInstance, PlatformType},
};

use crate::{
    Error, Result,
    model::{AutoConnect, DirectionMatrix, PlatformMapping},
    store::MappingStore,
};

/// Input for mapping creation.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub source_platform: PlatformType,
    pub source_instance_id: String,
    pub chatwoot_instance_id: Option<String>,
    pub dify_instance_id: Option<String>,
    pub directions: DirectionMatrix,
    pub auto_connect: AutoConnect,
}

/// Routing configuration for one source instance, shaped for UI consumption.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingConfiguration {
    pub has_mapping: bool,
    pub mappings: Vec<RoutingEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutingEntry {
    pub mapping_id: String,
    pub directions: DirectionMatrix,
    pub auto_connect: AutoConnect,
    pub chatwoot: Option<TargetSummary>,
    pub dify: Option<TargetSummary>,
}

/// A configured target with its display name joined in.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub instance_id: String,
    pub display_name: Option<String>,
}

/// Reachability of one platform during a connection test.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-target connection test outcome. Unconfigured targets are reported as
/// failed probes with a reason, never silently skipped, so incomplete setups
/// are visible; `overall_success` only ANDs the configured targets.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTestReport {
    pub telegram: ProbeResult,
    pub chatwoot: ProbeResult,
    pub dify: ProbeResult,
    pub overall_success: bool,
}

/// Validates and persists mappings and answers routing-configuration
/// queries.
pub struct MappingService {
    store: Arc<dyn MappingStore>,
    instances: Arc<InstanceDirectory>,
    registry: Arc<ClientRegistry>,
}

impl MappingService {
    pub fn new(
        store: Arc<dyn MappingStore>,
        instances: Arc<InstanceDirectory>,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            store,
            instances,
            registry,
        }
    }

    async fn require_active(
        &self,
        instance_id: &str,
        expected: PlatformType,
    ) -> Result<PlatformInstance> {
        let instance = self
            .instances
            .get_active(instance_id)
            .await?
            .ok_or_else(|| {
                Error::validation(format!(
                    "{expected} instance '{instance_id}' does not exist or is inactive"
                ))
            })?;
        if instance.platform != expected {
            return Err(Error::validation(format!(
                "instance '{instance_id}' is a {} instance, expected {expected}",
                instance.platform
            )));
        }
        Ok(instance)
    }

    /// Create a mapping after validating every referenced instance and
    /// checking for an active duplicate of the same triple.
    pub async fn create_mapping(
        &self,
        new: NewMapping,
        actor: &str,
    ) -> Result<PlatformMapping> {
        if new.chatwoot_instance_id.is_none() && new.dify_instance_id.is_none() {
            return Err(Error::validation(
                "a mapping needs at least one of a chatwoot account or a dify app",
            ));
        }

        self.require_active(&new.source_instance_id, new.source_platform)
            .await?;
        if let Some(id) = new.chatwoot_instance_id.as_deref() {
            self.require_active(id, PlatformType::Chatwoot).await?;
        }
        if let Some(id) = new.dify_instance_id.as_deref() {
            self.require_active(id, PlatformType::Dify).await?;
        }

        if let Some(existing) = self
            .store
            .find_active_by_triple(
                &new.source_instance_id,
                new.chatwoot_instance_id.as_deref(),
                new.dify_instance_id.as_deref(),
            )
            .await?
        {
            return Err(Error::conflict(format!(
                "an active mapping for this triple already exists: {}",
                existing.id
            )));
        }

        let now = unix_now();
        let mapping = PlatformMapping {
            id: uuid::Uuid::new_v4().to_string(),
            source_platform: new.source_platform,
            source_instance_id: new.source_instance_id,
            chatwoot_instance_id: new.chatwoot_instance_id,
            dify_instance_id: new.dify_instance_id,
            directions: new.directions,
            auto_connect: new.auto_connect,
            is_active: true,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&mapping).await?;
        info!(
            mapping_id = %mapping.id,
            source = %mapping.source_instance_id,
            created_by = actor,
            "created platform mapping"
        );
        Ok(mapping)
    }

    /// Routing configuration for one source instance. An instance without a
    /// mapping is an expected state, reported as `has_mapping: false`.
    pub async fn get_routing_configuration(
        &self,
        source_instance_id: &str,
    ) -> Result<RoutingConfiguration> {
        let mappings = self
            .store
            .list_active_for_instance(source_instance_id)
            .await?
            .into_iter()
            .filter(|m| m.source_instance_id == source_instance_id)
            .collect::<Vec<_>>();

        let mut entries = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            entries.push(RoutingEntry {
                mapping_id: mapping.id.clone(),
                directions: mapping.directions,
                auto_connect: mapping.auto_connect,
                chatwoot: self
                    .target_summary(mapping.chatwoot_instance_id.as_deref())
                    .await?,
                dify: self
                    .target_summary(mapping.dify_instance_id.as_deref())
                    .await?,
            });
        }
        Ok(RoutingConfiguration {
            has_mapping: !entries.is_empty(),
            mappings: entries,
        })
    }

    async fn target_summary(&self, instance_id: Option<&str>) -> Result<Option<TargetSummary>> {
        let Some(id) = instance_id else {
            return Ok(None);
        };
        let display_name = self
            .instances
            .get_active(id)
            .await?
            .map(|i| i.display_name);
        Ok(Some(TargetSummary {
            instance_id: id.to_string(),
            display_name,
        }))
    }

    /// Exact-match lookup used by the routing engine before forwarding.
    /// A miss is a normal outcome, not an error.
    pub async fn get_active_mapping(
        &self,
        source_instance_id: &str,
        chatwoot_instance_id: Option<&str>,
        dify_instance_id: Option<&str>,
    ) -> Result<Option<PlatformMapping>> {
        Ok(self
            .store
            .find_active_by_triple(source_instance_id, chatwoot_instance_id, dify_instance_id)
            .await?)
    }

    pub async fn update_directions(
        &self,
        mapping_id: &str,
        directions: DirectionMatrix,
    ) -> Result<PlatformMapping> {
        let mut mapping = self
            .store
            .get(mapping_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("mapping '{mapping_id}'")))?;
        mapping.directions = directions;
        mapping.updated_at = unix_now();
        self.store.update(&mapping).await?;
        Ok(mapping)
    }

    /// Toggle a mapping. Deactivation is soft: the row stays for audit.
    pub async fn set_active(&self, mapping_id: &str, active: bool) -> Result<PlatformMapping> {
        let mut mapping = self
            .store
            .get(mapping_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("mapping '{mapping_id}'")))?;
        mapping.is_active = active;
        mapping.updated_at = unix_now();
        self.store.update(&mapping).await?;
        info!(mapping_id, active, "toggled platform mapping");
        Ok(mapping)
    }

    /// Independently probe each configured target's reachability.
    pub async fn test_connection(&self, mapping_id: &str) -> Result<ConnectionTestReport> {
        let mapping = self
            .store
            .get(mapping_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("mapping '{mapping_id}'")))?;

        let telegram = self
            .probe(PlatformType::Telegram, Some(&mapping.source_instance_id))
            .await;
        let chatwoot = self
            .probe(
                PlatformType::Chatwoot,
                mapping.chatwoot_instance_id.as_deref(),
            )
            .await;
        let dify = self
            .probe(PlatformType::Dify, mapping.dify_instance_id.as_deref())
            .await;

        let mut overall_success = telegram.success;
        if mapping.chatwoot_instance_id.is_some() {
            overall_success &= chatwoot.success;
        }
        if mapping.dify_instance_id.is_some() {
            overall_success &= dify.success;
        }

        Ok(ConnectionTestReport {
            telegram,
            chatwoot,
            dify,
            overall_success,
        })
    }

    async fn probe(&self, platform: PlatformType, instance_id: Option<&str>) -> ProbeResult {
        let Some(instance_id) = instance_id else {
            return ProbeResult {
                success: false,
                error: Some(format!("{platform} is not configured for this mapping")),
            };
        };
        let instance = match self.instances.get_active(instance_id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                return ProbeResult {
                    success: false,
                    error: Some(format!(
                        "{platform} instance '{instance_id}' does not exist or is inactive"
                    )),
                };
            },
            Err(e) => {
                return ProbeResult {
                    success: false,
                    error: Some(format!("instance lookup failed: {e}")),
                };
            },
        };
        let Some(client) = self.registry.get(platform) else {
            return ProbeResult {
                success: false,
                error: Some(format!("no client registered for {platform}")),
            };
        };
        match client.test_connection(&instance).await {
            Ok(()) => ProbeResult {
                success: true,
                error: None,
            },
            Err(e) => {
                warn!(%platform, instance_id, error = %e, "connection probe failed");
                ProbeResult {
                    success: false,
                    error: Some(e.to_string()),
                }
            },
        }
    }
}
