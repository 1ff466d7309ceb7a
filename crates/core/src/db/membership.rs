//! Membership Graph: Collection↔Document and Session↔Document edges.
//! Counters are recomputed from the graph by aggregate queries, never
//! incremented application-side.

use uuid::Uuid;

use crate::db::pool::DbPool;
use crate::error::CoreError;
use crate::model::Collection;

pub struct MembershipStore {
    pool: DbPool,
}

impl MembershipStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn link_document_to_collection(&self, collection_id: Uuid, document_id: Uuid) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO collection_documents (collection_id, document_id, linked_at) VALUES ($1, $2, now())
             ON CONFLICT (collection_id, document_id) DO NOTHING",
        )
        .bind(collection_id)
        .bind(document_id)
        .execute(self.pool.get_pool())
        .await?;
        self.recompute_collection_counters(collection_id).await
    }

    pub async fn unlink_document_from_collection(&self, collection_id: Uuid, document_id: Uuid) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM collection_documents WHERE collection_id = $1 AND document_id = $2")
            .bind(collection_id)
            .bind(document_id)
            .execute(self.pool.get_pool())
            .await?;
        self.recompute_collection_counters(collection_id).await
    }

    /// Derives `document_count`/`total_chunks` straight from the graph and
    /// the documents table; never trust a counter that drifted from a
    /// crashed mid-ingest job.
    pub async fn recompute_collection_counters(&self, collection_id: Uuid) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE collections c SET
                document_count = (SELECT COUNT(*) FROM collection_documents cd WHERE cd.collection_id = c.id),
                total_chunks = COALESCE((
                    SELECT SUM(d.chunk_count) FROM collection_documents cd
                    JOIN documents d ON d.id = cd.document_id
                    WHERE cd.collection_id = c.id
                ), 0)
               WHERE c.id = $1"#,
        )
        .bind(collection_id)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn get_collection(&self, collection_id: Uuid) -> Result<Option<Collection>, CoreError> {
        let row = sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1")
            .bind(collection_id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(row)
    }

    pub async fn documents_in_collection(&self, collection_id: Uuid) -> Result<Vec<Uuid>, CoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT document_id FROM collection_documents WHERE collection_id = $1",
        )
        .bind(collection_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn link_document_to_session(&self, session_id: Uuid, document_id: Uuid) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO session_documents (session_id, document_id) VALUES ($1, $2)
             ON CONFLICT (session_id, document_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(document_id)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn documents_in_session(&self, session_id: Uuid) -> Result<Vec<Uuid>, CoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT document_id FROM session_documents WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
