//! Assembles the final LLM prompt from ranked/expanded context chunks,
//! attaching the `[D{n}:p{p}]` citation token every chunk must carry so the
//! model can cite it back.

use docint_core::model::Chunk;
use std::collections::HashMap;
use uuid::Uuid;

/// `document_order` maps each document id to its 1-based position within
/// the current run/session, matching the wire-exact citation format.
pub fn build_context_block(chunks: &[Chunk], document_order: &HashMap<Uuid, usize>) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let doc_index = document_order.get(&chunk.document_id).copied().unwrap_or(1);
            let page = chunk.page_number.unwrap_or(0);
            let citation = docint_core::citation::format_citation(doc_index, page);
            let heading = chunk
                .section_heading
                .as_deref()
                .map(|h| format!("{h}\n"))
                .unwrap_or_default();
            format!("{citation} {heading}{}", chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub fn build_chat_prompt(system_prompt: &str, context_block: &str, history: &str, user_query: &str) -> String {
    format!(
        "{system_prompt}\n\nRetrieved context (cite using the [D{{n}}:p{{p}}] tokens shown):\n{context_block}\n\n\
         Conversation so far:\n{history}\n\nUser: {user_query}\nAssistant:"
    )
}
