//! `LlmVerifier`: parses the iterative-refinement control tags
//! an answer may emit — `<NOT_RELEVANT/>` when the retrieved context
//! doesn't answer the question, `<NEED_MORE_CONTEXT/>` when it needs
//! another retrieval pass.

use once_cell::sync::Lazy;
use regex::Regex;

static NOT_RELEVANT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<NOT_RELEVANT\s*/?>").expect("valid regex"));
static NEED_MORE_CONTEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<NEED_MORE_CONTEXT\s*/?>").expect("valid regex"));

pub const MAX_VERIFICATION_ITERATIONS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Accepted,
    NotRelevant,
    NeedsMoreContext,
}

pub struct LlmVerifier;

impl LlmVerifier {
    pub fn classify(raw_answer: &str) -> VerificationOutcome {
        if NOT_RELEVANT.is_match(raw_answer) {
            VerificationOutcome::NotRelevant
        } else if NEED_MORE_CONTEXT.is_match(raw_answer) {
            VerificationOutcome::NeedsMoreContext
        } else {
            VerificationOutcome::Accepted
        }
    }

    /// Strips control tags before the answer is shown to the user.
    pub fn strip_tags(raw_answer: &str) -> String {
        let once = NOT_RELEVANT.replace_all(raw_answer, "");
        NEED_MORE_CONTEXT.replace_all(&once, "").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_not_relevant() {
        assert_eq!(LlmVerifier::classify("<NOT_RELEVANT/>"), VerificationOutcome::NotRelevant);
    }

    #[test]
    fn detects_need_more_context() {
        assert_eq!(
            LlmVerifier::classify("Partial answer. <NEED_MORE_CONTEXT/>"),
            VerificationOutcome::NeedsMoreContext
        );
    }

    #[test]
    fn accepts_clean_answer() {
        assert_eq!(LlmVerifier::classify("Revenue grew 10%."), VerificationOutcome::Accepted);
    }

    #[test]
    fn strips_tags_from_output() {
        assert_eq!(LlmVerifier::strip_tags("Answer here. <NEED_MORE_CONTEXT/>"), "Answer here.");
    }
}
