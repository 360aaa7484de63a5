use {anyhow::Result, async_trait::async_trait, sqlx::SqlitePool};

use {
    switchboard_common::unix_now,
    switchboard_platforms::{InstanceStore, PlatformInstance, PlatformType},
};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct InstanceRow {
    id: String,
    platform: String,
    display_name: String,
    credentials: String,
    is_active: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<InstanceRow> for PlatformInstance {
    type Error = anyhow::Error;

    fn try_from(r: InstanceRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            platform: r.platform.parse::<PlatformType>()?,
            display_name: r.display_name,
            credentials: serde_json::from_str(&r.credentials)?,
            is_active: r.is_active != 0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// SQLite-backed platform instance store.
///
/// Instance records are written by the administration layer; the routing
/// side only reads them, but `upsert` is exposed for provisioning and
/// tests.
pub struct SqliteInstanceStore {
    pool: SqlitePool,
}

impl SqliteInstanceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the platform_instances table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS platform_instances (
                id           TEXT    PRIMARY KEY,
                platform     TEXT    NOT NULL,
                display_name TEXT    NOT NULL,
                credentials  TEXT    NOT NULL,
                is_active    INTEGER NOT NULL DEFAULT 1,
                created_at   INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn upsert(&self, instance: &PlatformInstance) -> Result<()> {
        let credentials = serde_json::to_string(&instance.credentials)?;
        sqlx::query(
            "INSERT INTO platform_instances
             (id, platform, display_name, credentials, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                platform = excluded.platform,
                display_name = excluded.display_name,
                credentials = excluded.credentials,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
        )
        .bind(&instance.id)
        .bind(instance.platform.as_str())
        .bind(&instance.display_name)
        .bind(credentials)
        .bind(instance.is_active as i64)
        .bind(instance.created_at)
        .bind(unix_now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl InstanceStore for SqliteInstanceStore {
    async fn get(&self, id: &str) -> Result<Option<PlatformInstance>> {
        let row =
            sqlx::query_as::<_, InstanceRow>("SELECT * FROM platform_instances WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(PlatformInstance::try_from).transpose()
    }

    async fn list_by_platform(&self, platform: PlatformType) -> Result<Vec<PlatformInstance>> {
        let rows = sqlx::query_as::<_, InstanceRow>(
            "SELECT * FROM platform_instances WHERE platform = ? ORDER BY created_at",
        )
        .bind(platform.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(PlatformInstance::try_from)
            .collect::<Result<Vec<_>>>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        secrecy::{ExposeSecret, Secret},
        switchboard_platforms::InstanceCredentials,
    };

    use super::*;

    async fn store() -> SqliteInstanceStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteInstanceStore::init(&pool).await.unwrap();
        SqliteInstanceStore::new(pool)
    }

    fn instance(id: &str, platform: PlatformType) -> PlatformInstance {
        PlatformInstance {
            id: id.into(),
            platform,
            display_name: format!("{id} display"),
            credentials: InstanceCredentials {
                base_url: "https://api.example.com".into(),
                token: Secret::new("tok".into()),
                ..Default::default()
            },
            is_active: true,
            created_at: unix_now(),
            updated_at: unix_now(),
        }
    }

    #[tokio::test]
    async fn roundtrip_preserves_credentials() {
        let s = store().await;
        s.upsert(&instance("bot-1", PlatformType::Telegram))
            .await
            .unwrap();

        let got = s.get("bot-1").await.unwrap().unwrap();
        assert_eq!(got.platform, PlatformType::Telegram);
        assert_eq!(got.credentials.base_url, "https://api.example.com");
        assert_eq!(got.credentials.token.expose_secret(), "tok");
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_row() {
        let s = store().await;
        let mut inst = instance("bot-1", PlatformType::Telegram);
        s.upsert(&inst).await.unwrap();

        inst.is_active = false;
        s.upsert(&inst).await.unwrap();

        let got = s.get("bot-1").await.unwrap().unwrap();
        assert!(!got.is_active);
    }

    #[tokio::test]
    async fn list_filters_by_platform() {
        let s = store().await;
        s.upsert(&instance("bot-1", PlatformType::Telegram))
            .await
            .unwrap();
        s.upsert(&instance("desk-1", PlatformType::Chatwoot))
            .await
            .unwrap();

        let telegram = s.list_by_platform(PlatformType::Telegram).await.unwrap();
        assert_eq!(telegram.len(), 1);
        assert_eq!(telegram[0].id, "bot-1");
    }
}
