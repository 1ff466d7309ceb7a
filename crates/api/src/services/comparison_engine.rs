//! Comparison Engine: runs the same retrieval query
//! independently per document in scope and asks the LLM to produce a
//! per-document answer, then assembles a comparison matrix keyed by
//! document so the chat layer can render a side-by-side table.

use docint_core::db::chunks::Scope;
use docint_core::error::CoreError;
use docint_core::retrieval::{QueryPreferences, QueryType};
use docint_core::traits::LlmProvider;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::hybrid_retriever::HybridRetriever;
use crate::services::prompt_builder::build_context_block;

pub struct ComparisonEngine {
    retriever: Arc<HybridRetriever>,
    llm: Arc<dyn LlmProvider>,
}

impl ComparisonEngine {
    pub fn new(retriever: Arc<HybridRetriever>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { retriever, llm }
    }

    pub async fn compare(&self, query: &str, document_ids: &[Uuid], k: usize) -> Result<Value, CoreError> {
        let document_order: HashMap<Uuid, usize> =
            document_ids.iter().enumerate().map(|(i, id)| (*id, i + 1)).collect();
        let prefs = QueryPreferences::default();

        let mut per_document = Vec::with_capacity(document_ids.len());
        for (i, &document_id) in document_ids.iter().enumerate() {
            let scope = Scope::Documents(vec![document_id]);
            let results = self
                .retriever
                .retrieve(query, &scope, QueryType::Comparison, &prefs, k)
                .await?;
            let chunks: Vec<_> = results.into_iter().map(|r| r.chunk).collect();
            let context_block = build_context_block(&chunks, &document_order);

            let prompt = format!(
                "Answer the question using only this document's retrieved context, citing [D{doc_index}:pN] tokens.\n\n\
                 Context:\n{context_block}\n\nQuestion: {query}\nAnswer:",
                doc_index = i + 1,
            );
            let extraction = self.llm.extract_structured_data(&prompt, None, None, false).await?;
            per_document.push(json!({
                "document_id": document_id,
                "document_index": i + 1,
                "answer": extraction.raw_text,
            }));
        }

        Ok(json!({ "query": query, "documents": per_document }))
    }
}
