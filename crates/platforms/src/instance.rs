use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use switchboard_common::cache::{Clock, SystemClock, TtlCache};

use crate::types::PlatformType;

/// Connection credentials for one platform instance.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceCredentials {
    /// API base URL (e.g. `https://api.telegram.org`).
    pub base_url: String,

    /// Bot token, access token, or API key depending on the platform.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Chatwoot account id the token belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Chatwoot inbox messages are filed into. When unset, the inbox is
    /// auto-created on first forward if the mapping allows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox_id: Option<i64>,

    /// Dify application id the key belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Shared secret validated on inbound webhook calls.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub webhook_secret: Option<Secret<String>>,
}

impl std::fmt::Debug for InstanceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCredentials")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("inbox_id", &self.inbox_id)
            .field("app_id", &self.app_id)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for InstanceCredentials {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: Secret::new(String::new()),
            account_id: None,
            inbox_id: None,
            app_id: None,
            webhook_secret: None,
        }
    }
}

impl InstanceCredentials {
    pub fn token_is_empty(&self) -> bool {
        self.token.expose_secret().is_empty()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// One connected bot, account, or app.
///
/// Owned by the administration layer; the routing engine only reads active
/// instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInstance {
    pub id: String,
    pub platform: PlatformType,
    pub display_name: String,
    pub credentials: InstanceCredentials,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Read access to platform instance records.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PlatformInstance>>;
    async fn list_by_platform(&self, platform: PlatformType) -> Result<Vec<PlatformInstance>>;
}

/// Read-through instance lookup with a short TTL.
///
/// Instances are re-fetched after the TTL so an administrator deactivating
/// one takes effect within minutes; inactive instances always resolve as
/// absent.
pub struct InstanceDirectory {
    store: Arc<dyn InstanceStore>,
    cache: TtlCache<String, PlatformInstance>,
}

/// Default cache TTL for instance lookups.
pub const DEFAULT_INSTANCE_TTL: Duration = Duration::from_secs(120);

impl InstanceDirectory {
    pub fn new(store: Arc<dyn InstanceStore>) -> Self {
        Self::with_clock(store, DEFAULT_INSTANCE_TTL, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn InstanceStore>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache: TtlCache::with_clock(ttl, clock),
        }
    }

    /// Fetch an instance, serving from cache within the TTL. Returns `None`
    /// for unknown or inactive instances.
    pub async fn get_active(&self, id: &str) -> Result<Option<PlatformInstance>> {
        if let Some(instance) = self.cache.get(&id.to_string()) {
            return Ok(instance.is_active.then_some(instance));
        }
        let Some(instance) = self.store.get(id).await? else {
            return Ok(None);
        };
        self.cache.insert(id.to_string(), instance.clone());
        Ok(instance.is_active.then_some(instance))
    }

    /// Drop a cached entry so the next lookup hits the store.
    pub fn invalidate(&self, id: &str) {
        self.cache.invalidate(&id.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingStore {
        instance: PlatformInstance,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl InstanceStore for CountingStore {
        async fn get(&self, id: &str) -> Result<Option<PlatformInstance>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok((id == self.instance.id).then(|| self.instance.clone()))
        }

        async fn list_by_platform(
            &self,
            platform: PlatformType,
        ) -> Result<Vec<PlatformInstance>> {
            Ok((platform == self.instance.platform)
                .then(|| vec![self.instance.clone()])
                .unwrap_or_default())
        }
    }

    fn instance(active: bool) -> PlatformInstance {
        PlatformInstance {
            id: "bot-1".into(),
            platform: PlatformType::Telegram,
            display_name: "Support Bot".into(),
            credentials: InstanceCredentials::default(),
            is_active: active,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn second_lookup_served_from_cache() {
        let store = Arc::new(CountingStore {
            instance: instance(true),
            fetches: AtomicUsize::new(0),
        });
        let directory = InstanceDirectory::new(Arc::clone(&store) as Arc<dyn InstanceStore>);

        assert!(directory.get_active("bot-1").await.unwrap().is_some());
        assert!(directory.get_active("bot-1").await.unwrap().is_some());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inactive_instance_resolves_as_absent() {
        let store = Arc::new(CountingStore {
            instance: instance(false),
            fetches: AtomicUsize::new(0),
        });
        let directory = InstanceDirectory::new(store as Arc<dyn InstanceStore>);

        assert!(directory.get_active("bot-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_instance_is_none() {
        let store = Arc::new(CountingStore {
            instance: instance(true),
            fetches: AtomicUsize::new(0),
        });
        let directory = InstanceDirectory::new(store as Arc<dyn InstanceStore>);

        assert!(directory.get_active("missing").await.unwrap().is_none());
    }
}
