use {anyhow::Result, async_trait::async_trait};

use crate::model::PlatformMapping;

/// Persistent storage for platform mappings.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn insert(&self, mapping: &PlatformMapping) -> Result<()>;
    async fn update(&self, mapping: &PlatformMapping) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<PlatformMapping>>;
    /// Exact-match lookup on the full (source, chatwoot, dify) triple among
    /// active mappings.
    async fn find_active_by_triple(
        &self,
        source_instance_id: &str,
        chatwoot_instance_id: Option<&str>,
        dify_instance_id: Option<&str>,
    ) -> Result<Option<PlatformMapping>>;
    /// Active mappings referencing the instance as source or as either
    /// target.
    async fn list_active_for_instance(&self, instance_id: &str) -> Result<Vec<PlatformMapping>>;
}
