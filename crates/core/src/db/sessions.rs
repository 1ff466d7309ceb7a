//! Session / Message store. `message_index` is monotone per
//! session; callers must serialize appends through the DB, not in memory.

use uuid::Uuid;

use crate::db::pool::DbPool;
use crate::error::{CoreError, ErrorKind};
use crate::model::{Message, MessageRole, Session};

pub struct SessionStore {
    pool: DbPool,
}

impl SessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, tenant_id: Uuid, user_id: Uuid, title: &str) -> Result<Session, CoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions
                (id, tenant_id, user_id, title, message_count, last_summarized_index)
               VALUES ($1, $2, $3, $4, 0, 0)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(user_id)
        .bind(title)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Session>, CoreError> {
        let row = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(row)
    }

    /// Appends a message, assigning the next `message_index` inside the
    /// same transaction that bumps `sessions.message_count` so the two
    /// never drift.
    pub async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
        source_chunk_ids: &[Uuid],
        retrieval_query: Option<&str>,
    ) -> Result<Message, CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;

        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::new(ErrorKind::NotFound, "session not found"))?;

        let next_index = session.message_count;
        let message = sqlx::query_as::<_, Message>(
            r#"INSERT INTO messages
                (id, session_id, role, content, message_index, source_chunk_ids,
                 retrieval_query, num_chunks_retrieved)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(role)
        .bind(content)
        .bind(next_index)
        .bind(serde_json::to_value(source_chunk_ids).unwrap_or_default())
        .bind(retrieval_query)
        .bind(source_chunk_ids.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE sessions SET message_count = message_count + 1 WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    pub async fn recent_messages(&self, session_id: Uuid, limit: i64) -> Result<Vec<Message>, CoreError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE session_id = $1 ORDER BY message_index DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(rows.into_iter().rev().collect())
    }

    pub async fn update_summary(
        &self,
        session_id: Uuid,
        summary_text: &str,
        key_facts: &[String],
        summarized_index: i32,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE sessions SET last_summary_text = $2, last_summary_key_facts = $3,
                last_summarized_index = $4 WHERE id = $1"#,
        )
        .bind(session_id)
        .bind(summary_text)
        .bind(serde_json::to_value(key_facts).unwrap_or_default())
        .bind(summarized_index)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }
}
