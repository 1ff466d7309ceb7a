//! Section-aware smart chunking. Operates over a parser's
//! reading-order element stream so it is vendor-agnostic and independently
//! testable from `lopdf`/`docx-rs`/`calamine` parsing in `docint-worker`.

use uuid::Uuid;

use crate::model::{Chunk, ChunkMetadata, SectionType};

pub const MAX_NARRATIVE_TOKENS: usize = 500;

/// One reading-order element as emitted by a parser, before chunking.
#[derive(Debug, Clone)]
pub enum DocElement {
    Heading {
        level: u8,
        text: String,
        page: i32,
    },
    Paragraph {
        text: String,
        page: i32,
    },
    Table {
        rows: Vec<Vec<String>>,
        caption: Option<String>,
        page: i32,
    },
}

fn estimate_tokens(text: &str) -> usize {
    crate::compression::estimate_tokens(text)
}

/// Splits an oversize narrative into `MAX_NARRATIVE_TOKENS`-bounded pieces,
/// joined at paragraph boundaries where possible.
fn split_narrative(text: &str, max_tokens: usize) -> Vec<String> {
    if estimate_tokens(text) <= max_tokens {
        return vec![text.to_string()];
    }
    let max_chars = max_tokens * 4;
    let mut pieces = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            pieces.push(rest.to_string());
            break;
        }
        let boundary = rest
            .char_indices()
            .take(max_chars)
            .filter(|(_, c)| *c == '\n' || *c == '.')
            .map(|(i, _)| i + 1)
            .last()
            .unwrap_or_else(|| rest.char_indices().nth(max_chars).map(|(i, _)| i).unwrap_or(rest.len()));
        let (head, tail) = rest.split_at(boundary.max(1).min(rest.len()));
        pieces.push(head.to_string());
        rest = tail;
    }
    pieces
}

/// Walk the document's elements in reading order, group into sections by
/// heading hierarchy, and emit narrative + table chunks with full
/// relationship metadata.
pub fn smart_chunk(document_filename: &str, elements: &[DocElement]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut heading_stack: Vec<String> = Vec::new();
    let mut section_id = Uuid::new_v4();
    let mut narrative_buf = String::new();
    let mut narrative_page = 1;
    // (chunk index in `chunks`, is_narrative) for the most recent chunk of
    // each kind, used to link tables <-> nearest preceding narrative.
    let mut last_narrative_idx: Option<usize> = None;

    let mut chunk_index = 0i32;

    let flush_narrative = |chunks: &mut Vec<Chunk>,
                            chunk_index: &mut i32,
                            buf: &mut String,
                            page: i32,
                            heading_stack: &[String],
                            section_id: Uuid,
                            document_filename: &str,
                            last_narrative_idx: &mut Option<usize>| {
        if buf.trim().is_empty() {
            buf.clear();
            return;
        }
        let pieces = split_narrative(buf.trim(), MAX_NARRATIVE_TOKENS);
        let total = pieces.len() as u32;
        let first_id = Uuid::new_v4();
        let mut ids = Vec::with_capacity(pieces.len());
        for _ in &pieces {
            ids.push(Uuid::new_v4());
        }
        let base_idx = chunks.len();
        for (i, piece) in pieces.iter().enumerate() {
            let is_continuation = i > 0;
            let mut metadata = ChunkMetadata {
                section_id: Some(section_id.to_string()),
                is_continuation,
                chunk_sequence: Some(i as u32 + 1),
                total_chunks_in_section: Some(total),
                heading_hierarchy: heading_stack.to_vec(),
                document_filename: Some(document_filename.to_string()),
                first_sentence: piece.split(['.', '\n']).next().map(|s| s.trim().to_string()),
                ..Default::default()
            };
            if is_continuation {
                metadata.parent_chunk_id = Some(first_id);
            }
            metadata.sibling_chunk_ids = ids
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, id)| *id)
                .collect();

            chunks.push(Chunk {
                id: ids[i],
                document_id: Uuid::nil(),
                chunk_index: *chunk_index,
                text: piece.clone(),
                narrative_text: piece.clone(),
                tables: vec![],
                embedding: None,
                embedding_model: None,
                page_number: Some(page),
                page_range: None,
                section_type: SectionType::Narrative,
                section_heading: heading_stack.last().cloned(),
                is_tabular: false,
                token_count: estimate_tokens(piece) as i32,
                metadata,
            });
            *chunk_index += 1;
        }
        *last_narrative_idx = Some(base_idx);
        buf.clear();
    };

    for element in elements {
        match element {
            DocElement::Heading { text, page, .. } => {
                flush_narrative(
                    &mut chunks,
                    &mut chunk_index,
                    &mut narrative_buf,
                    narrative_page,
                    &heading_stack,
                    section_id,
                    document_filename,
                    &mut last_narrative_idx,
                );
                heading_stack.push(text.clone());
                section_id = Uuid::new_v4();
                narrative_page = *page;
            }
            DocElement::Paragraph { text, page } => {
                if narrative_buf.is_empty() {
                    narrative_page = *page;
                }
                narrative_buf.push_str(text);
                narrative_buf.push('\n');
            }
            DocElement::Table { rows, caption, page } => {
                let table_context = narrative_buf
                    .lines()
                    .last()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty());
                flush_narrative(
                    &mut chunks,
                    &mut chunk_index,
                    &mut narrative_buf,
                    narrative_page,
                    &heading_stack,
                    section_id,
                    document_filename,
                    &mut last_narrative_idx,
                );

                let table_id = Uuid::new_v4();
                let row_count = rows.len() as u32;
                let col_count = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
                let linked_narrative_id = last_narrative_idx.map(|idx| chunks[idx].id);

                let row_text = rows
                    .iter()
                    .map(|r| r.join(" | "))
                    .collect::<Vec<_>>()
                    .join("\n");

                chunks.push(Chunk {
                    id: table_id,
                    document_id: Uuid::nil(),
                    chunk_index,
                    text: row_text.clone(),
                    narrative_text: String::new(),
                    tables: rows.clone(),
                    embedding: None,
                    embedding_model: None,
                    page_number: Some(*page),
                    page_range: None,
                    section_type: SectionType::Table,
                    section_heading: heading_stack.last().cloned(),
                    is_tabular: true,
                    token_count: estimate_tokens(&row_text) as i32,
                    metadata: ChunkMetadata {
                        section_id: Some(section_id.to_string()),
                        heading_hierarchy: heading_stack.clone(),
                        document_filename: Some(document_filename.to_string()),
                        table_caption: caption.clone(),
                        table_context,
                        table_row_count: Some(row_count),
                        table_column_count: Some(col_count),
                        linked_narrative_id,
                        content_type: Some("table".to_string()),
                        ..Default::default()
                    },
                });

                if let Some(idx) = last_narrative_idx {
                    chunks[idx].metadata.linked_table_ids.push(table_id);
                }
                chunk_index += 1;
            }
        }
    }

    flush_narrative(
        &mut chunks,
        &mut chunk_index,
        &mut narrative_buf,
        narrative_page,
        &heading_stack,
        section_id,
        document_filename,
        &mut last_narrative_idx,
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_index_is_monotone_with_no_gaps() {
        let elements = vec![
            DocElement::Heading { level: 1, text: "Intro".into(), page: 1 },
            DocElement::Paragraph { text: "Hello world.".into(), page: 1 },
            DocElement::Table {
                rows: vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]],
                caption: Some("Table 1".into()),
                page: 1,
            },
        ];
        let chunks = smart_chunk("doc.pdf", &elements);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i32);
        }
    }

    #[test]
    fn oversize_narrative_splits_with_continuation_links() {
        let long_text = "Sentence number filler text here. ".repeat(400);
        let elements = vec![DocElement::Paragraph { text: long_text, page: 1 }];
        let chunks = smart_chunk("doc.pdf", &elements);
        assert!(chunks.len() > 1);
        let first = &chunks[0];
        assert!(!first.metadata.is_continuation);
        for c in &chunks[1..] {
            assert!(c.metadata.is_continuation);
            assert_eq!(c.metadata.parent_chunk_id, Some(first.id));
        }
    }

    #[test]
    fn table_links_nearest_preceding_narrative() {
        let elements = vec![
            DocElement::Paragraph { text: "Revenue overview.".into(), page: 2 },
            DocElement::Table {
                rows: vec![vec!["Q1".into(), "100".into()]],
                caption: None,
                page: 2,
            },
        ];
        let chunks = smart_chunk("doc.pdf", &elements);
        let narrative = chunks.iter().find(|c| !c.is_tabular).unwrap();
        let table = chunks.iter().find(|c| c.is_tabular).unwrap();
        assert_eq!(table.metadata.linked_narrative_id, Some(narrative.id));
        assert!(narrative.metadata.linked_table_ids.contains(&table.id));
    }

    #[test]
    fn every_chunk_has_document_filename() {
        let elements = vec![DocElement::Paragraph { text: "x".into(), page: 1 }];
        let chunks = smart_chunk("report.pdf", &elements);
        for c in &chunks {
            assert_eq!(c.metadata.document_filename.as_deref(), Some("report.pdf"));
        }
    }
}
