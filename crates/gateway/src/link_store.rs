use {anyhow::Result, async_trait::async_trait, sqlx::SqlitePool};

use {
    switchboard_common::unix_now,
    switchboard_platforms::{ConversationLink, ConversationLinkStore},
};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct LinkRow {
    telegram_bot_id: String,
    external_chat_id: String,
    chatwoot_conversation_id: Option<i64>,
    chatwoot_contact_id: Option<i64>,
    dify_conversation_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<LinkRow> for ConversationLink {
    fn from(r: LinkRow) -> Self {
        Self {
            telegram_bot_id: r.telegram_bot_id,
            external_chat_id: r.external_chat_id,
            chatwoot_conversation_id: r.chatwoot_conversation_id,
            chatwoot_contact_id: r.chatwoot_contact_id,
            dify_conversation_id: r.dify_conversation_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// SQLite-backed conversation link store.
pub struct SqliteConversationLinkStore {
    pool: SqlitePool,
}

impl SqliteConversationLinkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the conversation_links table schema.
    ///
    /// The unique (bot, chat) key makes repeated upserts for the same
    /// conversation converge on one row instead of accumulating duplicates.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversation_links (
                telegram_bot_id          TEXT NOT NULL,
                external_chat_id         TEXT NOT NULL,
                chatwoot_conversation_id INTEGER,
                chatwoot_contact_id      INTEGER,
                dify_conversation_id     TEXT,
                created_at               INTEGER NOT NULL,
                updated_at               INTEGER NOT NULL,
                PRIMARY KEY (telegram_bot_id, external_chat_id)
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_links_chatwoot_conversation
             ON conversation_links (chatwoot_conversation_id)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationLinkStore for SqliteConversationLinkStore {
    async fn find(
        &self,
        telegram_bot_id: &str,
        external_chat_id: &str,
    ) -> Result<Option<ConversationLink>> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT * FROM conversation_links
             WHERE telegram_bot_id = ? AND external_chat_id = ?",
        )
        .bind(telegram_bot_id)
        .bind(external_chat_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ConversationLink::from))
    }

    async fn find_by_chatwoot_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationLink>> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT * FROM conversation_links WHERE chatwoot_conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ConversationLink::from))
    }

    async fn find_by_dify_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationLink>> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT * FROM conversation_links WHERE dify_conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ConversationLink::from))
    }

    async fn upsert(&self, link: ConversationLink) -> Result<()> {
        let now = unix_now();
        sqlx::query(
            "INSERT INTO conversation_links
             (telegram_bot_id, external_chat_id, chatwoot_conversation_id,
              chatwoot_contact_id, dify_conversation_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (telegram_bot_id, external_chat_id) DO UPDATE SET
                chatwoot_conversation_id = excluded.chatwoot_conversation_id,
                chatwoot_contact_id = excluded.chatwoot_contact_id,
                dify_conversation_id = excluded.dify_conversation_id,
                updated_at = excluded.updated_at",
        )
        .bind(&link.telegram_bot_id)
        .bind(&link.external_chat_id)
        .bind(link.chatwoot_conversation_id)
        .bind(link.chatwoot_contact_id)
        .bind(&link.dify_conversation_id)
        .bind(if link.created_at > 0 { link.created_at } else { now })
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn store() -> SqliteConversationLinkStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteConversationLinkStore::init(&pool).await.unwrap();
        SqliteConversationLinkStore::new(pool)
    }

    #[tokio::test]
    async fn upsert_converges_on_one_row() {
        let s = store().await;

        let mut link = ConversationLink::new("bot-1", "42");
        link.chatwoot_conversation_id = Some(77);
        s.upsert(link.clone()).await.unwrap();

        link.dify_conversation_id = Some("conv-9".into());
        s.upsert(link).await.unwrap();

        let got = s.find("bot-1", "42").await.unwrap().unwrap();
        assert_eq!(got.chatwoot_conversation_id, Some(77));
        assert_eq!(got.dify_conversation_id.as_deref(), Some("conv-9"));
    }

    #[tokio::test]
    async fn reverse_lookups_find_the_link() {
        let s = store().await;

        let mut link = ConversationLink::new("bot-1", "42");
        link.chatwoot_conversation_id = Some(77);
        link.dify_conversation_id = Some("conv-9".into());
        s.upsert(link).await.unwrap();

        let by_chatwoot = s.find_by_chatwoot_conversation(77).await.unwrap().unwrap();
        assert_eq!(by_chatwoot.external_chat_id, "42");

        let by_dify = s.find_by_dify_conversation("conv-9").await.unwrap().unwrap();
        assert_eq!(by_dify.external_chat_id, "42");
    }

    #[tokio::test]
    async fn miss_is_none() {
        let s = store().await;
        assert!(s.find("bot-1", "42").await.unwrap().is_none());
        assert!(s.find_by_chatwoot_conversation(1).await.unwrap().is_none());
    }
}
