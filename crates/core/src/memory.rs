//! Progressive conversation memory: rolling summary trigger decision and
//! key-fact merging. The actual LLM call that produces the
//! updated summary text is an external collaborator; this module owns the
//! deterministic parts: whether to summarize, and how to merge facts.

use crate::compression::estimate_tokens;

#[derive(Debug, Clone)]
pub struct MemoryBudgetConfig {
    pub summary_trigger_ratio: f32,
    pub min_messages: usize,
    pub max_history_messages: usize,
    pub verbatim_message_count: usize,
    pub model_input_budget: usize,
}

impl Default for MemoryBudgetConfig {
    fn default() -> Self {
        Self {
            summary_trigger_ratio: 0.7,
            min_messages: 6,
            max_history_messages: 50,
            verbatim_message_count: 6,
            model_input_budget: 8000,
        }
    }
}

/// Whether the recent history plus the new message is large enough,
/// relative to the model's input budget, to justify summarizing.
pub fn should_summarize(history: &[String], new_message: &str, cfg: &MemoryBudgetConfig) -> bool {
    if history.len() < cfg.min_messages {
        return false;
    }
    let used: usize = history.iter().map(|m| estimate_tokens(m)).sum::<usize>()
        + estimate_tokens(new_message);
    let ratio = used as f32 / cfg.model_input_budget.max(1) as f32;
    ratio >= cfg.summary_trigger_ratio
}

/// Case-insensitive dedup, keeping the 10 most-recently-seen facts. `new`
/// facts take precedence over `existing` ones with the same key.
pub fn merge_key_facts(existing: &[String], new: &[String], cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();

    // Newest first so recency wins the cap.
    for fact in new.iter().chain(existing.iter()) {
        let key = fact.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        merged.push(fact.clone());
        if merged.len() >= cap {
            break;
        }
    }
    merged
}

/// Clamp a progressive summary to the configured character ceiling; callers
/// pass already-generated summary text (the LLM call lives in `docint-api`).
pub fn clamp_summary(summary: &str, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        summary.to_string()
    } else {
        summary.chars().take(max_chars).collect()
    }
}

/// Which of the recent messages stay verbatim in the next prompt —
/// the last `verbatim_message_count` turns.
pub fn recent_window<'a>(history: &'a [String], verbatim_message_count: usize) -> &'a [String] {
    let start = history.len().saturating_sub(verbatim_message_count);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_history_never_triggers() {
        let cfg = MemoryBudgetConfig::default();
        assert!(!should_summarize(&["hi".into()], "there", &cfg));
    }

    #[test]
    fn large_history_triggers_above_ratio() {
        let cfg = MemoryBudgetConfig {
            min_messages: 1,
            model_input_budget: 100,
            summary_trigger_ratio: 0.5,
            ..Default::default()
        };
        let history = vec!["word ".repeat(40)];
        assert!(should_summarize(&history, "more words here", &cfg));
    }

    #[test]
    fn key_facts_dedup_case_insensitively_and_cap() {
        let existing = vec!["Budget is $5M".to_string(), "Acme Corp".to_string()];
        let new = vec!["budget is $5m".to_string(), "Deadline: March".to_string()];
        let merged = merge_key_facts(&existing, &new, 3);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], "budget is $5m");
    }

    #[test]
    fn summary_clamped_to_char_ceiling() {
        let long = "x".repeat(3000);
        assert_eq!(clamp_summary(&long, 2000).chars().count(), 2000);
    }
}
