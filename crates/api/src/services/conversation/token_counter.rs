//! Token accounting for the conversation memory budget. Kept deterministic
//! by delegating to `docint_core::compression::estimate_tokens`.

use docint_core::compression::estimate_tokens;

pub fn count_text(text: &str) -> usize {
    estimate_tokens(text)
}

pub fn count_messages(messages: &[String]) -> usize {
    messages.iter().map(|m| count_text(m)).sum()
}
