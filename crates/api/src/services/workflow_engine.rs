//! Workflow Engine: runs a workflow's `retrieval_spec`, builds
//! a prompt per section (or the whole document for `direct` mode),
//! extracts structured output, normalizes it, and validates citation
//! closure before persisting the run.

use docint_core::db::chunks::Scope;
use docint_core::db::workflows::WorkflowStore;
use docint_core::error::{CoreError, ErrorKind};
use docint_core::model::{Workflow, WorkflowMode, WorkflowRun};
use docint_core::retrieval::QueryPreferences;
use docint_core::traits::LlmProvider;
use docint_core::workflow_normalize::{invalid_citations, normalize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::services::hybrid_retriever::HybridRetriever;
use crate::services::prompt_builder::build_context_block;

/// Map-reduce (per-section retrieval) when the flattened retrieval spec
/// would overflow the reduce-stage token budget; direct otherwise.
const MAP_REDUCE_TOKEN_THRESHOLD: usize = 6000;

pub struct WorkflowEngine {
    workflows: Arc<WorkflowStore>,
    retriever: Arc<HybridRetriever>,
    llm: Arc<dyn LlmProvider>,
}

impl WorkflowEngine {
    pub fn new(workflows: Arc<WorkflowStore>, retriever: Arc<HybridRetriever>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { workflows, retriever, llm }
    }

    pub async fn run(
        &self,
        workflow: &Workflow,
        tenant_id: Uuid,
        user_id: Uuid,
        document_ids: &[Uuid],
        variables: Value,
    ) -> Result<WorkflowRun, CoreError> {
        if document_ids.len() < workflow.min_documents as usize || document_ids.len() > workflow.max_documents as usize {
            return Err(CoreError::new(
                ErrorKind::Validation,
                format!(
                    "workflow {} requires between {} and {} documents, got {}",
                    workflow.name, workflow.min_documents, workflow.max_documents, document_ids.len()
                ),
            ));
        }

        let document_order: HashMap<Uuid, usize> =
            document_ids.iter().enumerate().map(|(i, id)| (*id, i + 1)).collect();
        let scope = Scope::Documents(document_ids.to_vec());

        let estimated_tokens: usize = workflow.retrieval_spec.iter().map(|item| item.max_chunks * 200).sum();
        let mode = if estimated_tokens > MAP_REDUCE_TOKEN_THRESHOLD {
            WorkflowMode::MapReduce
        } else {
            WorkflowMode::Direct
        };

        let run = self
            .workflows
            .create_run(workflow.id, tenant_id, user_id, document_ids, variables.clone(), mode)
            .await?;
        self.workflows.set_status(run.id, docint_core::model::JobStatus::Processing).await?;

        let mut section_summaries = Vec::new();
        let mut context_citations: BTreeSet<String> = BTreeSet::new();
        let mut total_prompt_tokens = 0u32;
        let mut total_completion_tokens = 0u32;

        for item in &workflow.retrieval_spec {
            let prefs = QueryPreferences {
                prefer_tables: item.prefer_tables,
                prefer_narrative: !item.prefer_tables,
            };
            let mut section_chunks = Vec::new();
            for query in &item.queries {
                let results = self
                    .retriever
                    .retrieve(query, &scope, docint_core::retrieval::QueryType::DataExtraction, &prefs, item.max_chunks)
                    .await?;
                section_chunks.extend(results.into_iter().map(|r| r.chunk));
            }
            let context_block = build_context_block(&section_chunks, &document_order);
            for token in docint_core::citation::extract_citations(&context_block) {
                context_citations.insert(token);
            }

            let section_prompt = workflow
                .prompt_template
                .replace("{{section_key}}", &item.key)
                .replace("{{section_title}}", &item.title)
                .replace("{{context}}", &context_block);

            let extraction = self
                .llm
                .extract_structured_data(&section_prompt, None, None, false)
                .await?;
            total_prompt_tokens += extraction.usage.prompt_tokens;
            total_completion_tokens += extraction.usage.completion_tokens;

            section_summaries.push(json!({
                "key": item.key,
                "title": item.title,
                "output": extraction.data.clone().unwrap_or(json!(extraction.raw_text)),
            }));
        }

        let merged = json!({ "sections": section_summaries });
        let artifact = normalize(merged);
        let artifact_text = serde_json::to_string(&artifact).unwrap_or_default();
        let invalid = invalid_citations(&artifact_text, &context_citations);
        let citations_count = docint_core::citation::extract_citations(&artifact_text).len() as i32;

        self.workflows
            .complete_run(
                run.id,
                artifact,
                Some(json!(section_summaries)),
                (total_prompt_tokens + total_completion_tokens) as i32,
                0.0,
                citations_count,
                &invalid,
                Some(json!({ "mode": mode })),
            )
            .await?;

        self.workflows.get_run(run.id).await?.ok_or_else(|| CoreError::new(ErrorKind::NotFound, "workflow run vanished"))
    }
}
