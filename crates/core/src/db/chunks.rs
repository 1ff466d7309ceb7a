//! Chunk Store & retrieval indices.

use pgvector::Vector;
use sqlx::Row;
use uuid::Uuid;

use crate::db::pool::DbPool;
use crate::error::CoreError;
use crate::model::{Chunk, ChunkMetadata, SectionType};

pub enum Scope {
    Collection(Uuid),
    Documents(Vec<Uuid>),
}

pub struct ChunkStore {
    pool: DbPool,
}

fn row_to_chunk(row: sqlx::postgres::PgRow) -> Result<Chunk, CoreError> {
    let metadata_json: serde_json::Value = row.try_get("chunk_metadata").unwrap_or(serde_json::json!({}));
    let mut metadata: ChunkMetadata = serde_json::from_value(metadata_json).unwrap_or_default();
    let document_id: Uuid = row.try_get("document_id").map_err(CoreError::from)?;
    if metadata.document_filename.is_none() {
        // normalize contract: fall back to document_id when the
        // parser never materialized a filename.
        metadata.document_filename = Some(document_id.to_string());
    }
    let section_type: String = row.try_get("section_type").unwrap_or_else(|_| "narrative".to_string());
    let embedding: Option<Vector> = row.try_get("embedding").ok();

    Ok(Chunk {
        id: row.try_get("id").map_err(CoreError::from)?,
        document_id,
        chunk_index: row.try_get("chunk_index").map_err(CoreError::from)?,
        text: row.try_get("text").map_err(CoreError::from)?,
        narrative_text: row.try_get("narrative_text").unwrap_or_default(),
        tables: row
            .try_get::<Option<serde_json::Value>, _>("tables")
            .ok()
            .flatten()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default(),
        embedding: embedding.map(|v| v.to_vec()),
        embedding_model: row.try_get("embedding_model").ok(),
        page_number: row.try_get("page_number").ok(),
        page_range: None,
        section_type: if section_type == "table" { SectionType::Table } else { SectionType::Narrative },
        section_heading: row.try_get("section_heading").ok(),
        is_tabular: row.try_get("is_tabular").unwrap_or(false),
        token_count: row.try_get("token_count").unwrap_or(0),
        metadata,
    })
}

impl ChunkStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn bulk_insert(&self, chunks: &[Chunk]) -> Result<(), CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;
        for chunk in chunks {
            let embedding = chunk.embedding.clone().map(Vector::from);
            sqlx::query(
                r#"INSERT INTO chunks
                    (id, document_id, chunk_index, text, narrative_text, tables, embedding,
                     embedding_model, page_number, section_type, section_heading, is_tabular,
                     token_count, chunk_metadata)
                   VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)"#,
            )
            .bind(chunk.id)
            .bind(chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.narrative_text)
            .bind(serde_json::to_value(&chunk.tables).unwrap_or_default())
            .bind(embedding)
            .bind(&chunk.embedding_model)
            .bind(chunk.page_number)
            .bind(match chunk.section_type {
                SectionType::Narrative => "narrative",
                SectionType::Table => "table",
            })
            .bind(&chunk.section_heading)
            .bind(chunk.is_tabular)
            .bind(chunk.token_count)
            .bind(serde_json::to_value(&chunk.metadata).unwrap_or_default())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count_for_documents(&self, ids: &[Uuid]) -> Result<i64, CoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM chunks WHERE document_id = ANY($1)")
            .bind(ids)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(row.try_get::<i64, _>("n").unwrap_or(0))
    }

    pub async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<Chunk>, CoreError> {
        // Single batch query — callers (context expander) must never loop
        // per-id.
        let rows = sqlx::query("SELECT * FROM chunks WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(row_to_chunk).collect()
    }

    pub async fn get_by_page(&self, document_id: Uuid, page: i32) -> Result<Vec<Chunk>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM chunks WHERE document_id = $1 AND page_number = $2 ORDER BY chunk_index",
        )
        .bind(document_id)
        .bind(page)
        .fetch_all(self.pool.get_pool())
        .await?;
        rows.into_iter().map(row_to_chunk).collect()
    }

    fn scope_clause(scope: &Scope) -> &'static str {
        match scope {
            Scope::Collection(_) => {
                "document_id IN (SELECT document_id FROM collection_documents WHERE collection_id = $2)"
            }
            Scope::Documents(_) => "document_id = ANY($2)",
        }
    }

    /// Cosine-similarity search; caller applies an optional distance
    /// threshold and per-page min-max normalization afterward.
    pub async fn semantic_search(
        &self,
        embedding: Vec<f32>,
        scope: &Scope,
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, CoreError> {
        let clause = Self::scope_clause(scope);
        let sql = format!(
            "SELECT *, 1 - (embedding <=> $1) AS similarity FROM chunks WHERE {clause} \
             ORDER BY embedding <=> $1 LIMIT {k}"
        );
        let mut query = sqlx::query(&sql).bind(Vector::from(embedding));
        query = match scope {
            Scope::Collection(id) => query.bind(*id),
            Scope::Documents(ids) => query.bind(ids.clone()),
        };
        let rows = query.fetch_all(self.pool.get_pool()).await?;
        rows.into_iter()
            .map(|row| {
                let sim: f32 = row.try_get("similarity").unwrap_or(0.0);
                row_to_chunk(row).map(|c| (c, sim))
            })
            .collect()
    }

    /// Length-normalized BM25-like rank via Postgres full-text search;
    /// `prefer_tables` boosts table chunks by a configured factor.
    pub async fn keyword_search(
        &self,
        query_text: &str,
        scope: &Scope,
        k: usize,
        prefer_tables: bool,
        table_boost: f32,
    ) -> Result<Vec<(Chunk, f32)>, CoreError> {
        let clause = Self::scope_clause(scope);
        let sql = format!(
            "SELECT *, ts_rank_cd(to_tsvector('english', text), plainto_tsquery('english', $1)) AS rank \
             FROM chunks WHERE {clause} AND to_tsvector('english', text) @@ plainto_tsquery('english', $1) \
             ORDER BY rank DESC LIMIT {k}"
        );
        let mut query = sqlx::query(&sql).bind(query_text);
        query = match scope {
            Scope::Collection(id) => query.bind(*id),
            Scope::Documents(ids) => query.bind(ids.clone()),
        };
        let rows = query.fetch_all(self.pool.get_pool()).await?;
        rows.into_iter()
            .map(|row| {
                let mut rank: f32 = row.try_get("rank").unwrap_or(0.0);
                let chunk = row_to_chunk(row)?;
                if prefer_tables && chunk.is_tabular {
                    rank *= table_boost;
                }
                Ok((chunk, rank))
            })
            .collect()
    }
}
