//! Wire-exact citation token format: `[D{doc_index}:p{page_number}]`.

use once_cell::sync::Lazy;
use regex::Regex;

pub static CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[D(\d+):p(\d+)\]").expect("citation regex is valid"));

/// `doc_index` is the 1-based position of the document within the run's
/// `document_ids` list.
pub fn format_citation(doc_index: usize, page_number: i32) -> String {
    format!("[D{}:p{}]", doc_index, page_number)
}

/// Extract every citation token appearing in `text`, in order of first
/// appearance, without deduplication.
pub fn extract_citations(text: &str) -> Vec<String> {
    CITATION_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// The deduped, sorted set of citation tokens in `text` — used both for
/// `references` rebuilding and citation-closure checks.
pub fn citation_set(text: &str) -> std::collections::BTreeSet<String> {
    extract_citations(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_wire_exact() {
        assert_eq!(format_citation(1, 12), "[D1:p12]");
    }

    #[test]
    fn extracts_all_tokens() {
        let text = "Revenue grew [D1:p3] while margin fell [D2:p10] then [D1:p3] again.";
        assert_eq!(extract_citations(text).len(), 3);
        assert_eq!(citation_set(text).len(), 2);
    }

    #[test]
    fn ignores_malformed_tokens() {
        assert!(extract_citations("[Dx:p1] [D1:p] [D1:p1]") == vec!["[D1:p1]"]);
    }
}
