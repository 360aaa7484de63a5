use {anyhow::Result, async_trait::async_trait, sqlx::SqlitePool};

use switchboard_platforms::PlatformType;

use crate::{
    model::{AutoConnect, DirectionMatrix, PlatformMapping},
    store::MappingStore,
};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct MappingRow {
    id: String,
    source_platform: String,
    source_instance_id: String,
    chatwoot_instance_id: Option<String>,
    dify_instance_id: Option<String>,
    telegram_to_chatwoot: i64,
    telegram_to_dify: i64,
    chatwoot_to_telegram: i64,
    chatwoot_to_dify: i64,
    dify_to_telegram: i64,
    dify_to_chatwoot: i64,
    auto_connect_chatwoot: i64,
    auto_connect_dify: i64,
    is_active: i64,
    created_by: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<MappingRow> for PlatformMapping {
    type Error = anyhow::Error;

    fn try_from(r: MappingRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            source_platform: r.source_platform.parse::<PlatformType>()?,
            source_instance_id: r.source_instance_id,
            chatwoot_instance_id: r.chatwoot_instance_id,
            dify_instance_id: r.dify_instance_id,
            directions: DirectionMatrix {
                telegram_to_chatwoot: r.telegram_to_chatwoot != 0,
                telegram_to_dify: r.telegram_to_dify != 0,
                chatwoot_to_telegram: r.chatwoot_to_telegram != 0,
                chatwoot_to_dify: r.chatwoot_to_dify != 0,
                dify_to_telegram: r.dify_to_telegram != 0,
                dify_to_chatwoot: r.dify_to_chatwoot != 0,
            },
            auto_connect: AutoConnect {
                telegram_chatwoot: r.auto_connect_chatwoot != 0,
                telegram_dify: r.auto_connect_dify != 0,
            },
            is_active: r.is_active != 0,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// SQLite-backed mapping store.
pub struct SqliteMappingStore {
    pool: SqlitePool,
}

impl SqliteMappingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the platform_mappings table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS platform_mappings (
                id                    TEXT    PRIMARY KEY,
                source_platform       TEXT    NOT NULL DEFAULT 'telegram',
                source_instance_id    TEXT    NOT NULL,
                chatwoot_instance_id  TEXT,
                dify_instance_id      TEXT,
                telegram_to_chatwoot  INTEGER NOT NULL DEFAULT 1,
                telegram_to_dify      INTEGER NOT NULL DEFAULT 1,
                chatwoot_to_telegram  INTEGER NOT NULL DEFAULT 1,
                chatwoot_to_dify      INTEGER NOT NULL DEFAULT 0,
                dify_to_telegram      INTEGER NOT NULL DEFAULT 1,
                dify_to_chatwoot      INTEGER NOT NULL DEFAULT 0,
                auto_connect_chatwoot INTEGER NOT NULL DEFAULT 0,
                auto_connect_dify     INTEGER NOT NULL DEFAULT 0,
                is_active             INTEGER NOT NULL DEFAULT 1,
                created_by            TEXT    NOT NULL,
                created_at            INTEGER NOT NULL,
                updated_at            INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        // Backstop for the service-level duplicate check; NULL targets are
        // folded so the triple is unique among active rows.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_active_triple
             ON platform_mappings (
                source_instance_id,
                COALESCE(chatwoot_instance_id, ''),
                COALESCE(dify_instance_id, '')
             ) WHERE is_active = 1",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    async fn insert(&self, m: &PlatformMapping) -> Result<()> {
        sqlx::query(
            "INSERT INTO platform_mappings
             (id, source_platform, source_instance_id, chatwoot_instance_id, dify_instance_id,
              telegram_to_chatwoot, telegram_to_dify, chatwoot_to_telegram, chatwoot_to_dify,
              dify_to_telegram, dify_to_chatwoot, auto_connect_chatwoot, auto_connect_dify,
              is_active, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&m.id)
        .bind(m.source_platform.as_str())
        .bind(&m.source_instance_id)
        .bind(&m.chatwoot_instance_id)
        .bind(&m.dify_instance_id)
        .bind(m.directions.telegram_to_chatwoot as i64)
        .bind(m.directions.telegram_to_dify as i64)
        .bind(m.directions.chatwoot_to_telegram as i64)
        .bind(m.directions.chatwoot_to_dify as i64)
        .bind(m.directions.dify_to_telegram as i64)
        .bind(m.directions.dify_to_chatwoot as i64)
        .bind(m.auto_connect.telegram_chatwoot as i64)
        .bind(m.auto_connect.telegram_dify as i64)
        .bind(m.is_active as i64)
        .bind(&m.created_by)
        .bind(m.created_at)
        .bind(m.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, m: &PlatformMapping) -> Result<()> {
        sqlx::query(
            "UPDATE platform_mappings SET
                telegram_to_chatwoot = ?, telegram_to_dify = ?,
                chatwoot_to_telegram = ?, chatwoot_to_dify = ?,
                dify_to_telegram = ?, dify_to_chatwoot = ?,
                auto_connect_chatwoot = ?, auto_connect_dify = ?,
                is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(m.directions.telegram_to_chatwoot as i64)
        .bind(m.directions.telegram_to_dify as i64)
        .bind(m.directions.chatwoot_to_telegram as i64)
        .bind(m.directions.chatwoot_to_dify as i64)
        .bind(m.directions.dify_to_telegram as i64)
        .bind(m.directions.dify_to_chatwoot as i64)
        .bind(m.auto_connect.telegram_chatwoot as i64)
        .bind(m.auto_connect.telegram_dify as i64)
        .bind(m.is_active as i64)
        .bind(m.updated_at)
        .bind(&m.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PlatformMapping>> {
        let row = sqlx::query_as::<_, MappingRow>("SELECT * FROM platform_mappings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PlatformMapping::try_from).transpose()
    }

    async fn find_active_by_triple(
        &self,
        source_instance_id: &str,
        chatwoot_instance_id: Option<&str>,
        dify_instance_id: Option<&str>,
    ) -> Result<Option<PlatformMapping>> {
        let row = sqlx::query_as::<_, MappingRow>(
            "SELECT * FROM platform_mappings
             WHERE is_active = 1
               AND source_instance_id = ?
               AND chatwoot_instance_id IS ?
               AND dify_instance_id IS ?",
        )
        .bind(source_instance_id)
        .bind(chatwoot_instance_id)
        .bind(dify_instance_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PlatformMapping::try_from).transpose()
    }

    async fn list_active_for_instance(&self, instance_id: &str) -> Result<Vec<PlatformMapping>> {
        let rows = sqlx::query_as::<_, MappingRow>(
            "SELECT * FROM platform_mappings
             WHERE is_active = 1
               AND (source_instance_id = ?
                    OR chatwoot_instance_id = ?
                    OR dify_instance_id = ?)
             ORDER BY created_at",
        )
        .bind(instance_id)
        .bind(instance_id)
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(PlatformMapping::try_from)
            .collect::<Result<Vec<_>>>()
    }
}
