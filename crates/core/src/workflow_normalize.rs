//! Domain-agnostic workflow output normalization and citation validation
//!. Operates on `serde_json::Value` since `output_schema` is
//! configuration, not a compile-time type.

use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::citation::citation_set;

pub const MIN_RISK_SECTIONS: usize = 1;
pub const MIN_OPPORTUNITY_SECTIONS: usize = 1;

const SEVERITY_ENUM: &[&str] = &["low", "medium", "high", "critical"];

fn coerce_enum(value: &str, allowed: &[&str], default: &str) -> String {
    let lower = value.to_lowercase();
    if allowed.contains(&lower.as_str()) {
        lower
    } else {
        default.to_string()
    }
}

fn clamp_confidence(v: &Value) -> Option<Value> {
    let n = v.as_f64()?;
    let clamped = if n > 1.0 { (n / 100.0).clamp(0.0, 1.0) } else { n.clamp(0.0, 1.0) };
    Some(json!(clamped))
}

/// Promote a `["a", "b"]` string array into `[{key, title, content,
/// citations}]` object arrays, the shape every downstream renderer expects.
fn promote_string_array(arr: &[Value]) -> Vec<Value> {
    arr.iter()
        .enumerate()
        .filter_map(|(i, v)| {
            let text = v.as_str()?;
            let citations: Vec<String> = citation_set(text).into_iter().collect();
            Some(json!({
                "key": format!("item_{i}"),
                "title": text.split('.').next().unwrap_or(text).trim(),
                "content": text,
                "citations": citations,
            }))
        })
        .collect()
}

fn reshape_risk_or_opportunity(v: &Value, severity_key: &str) -> Value {
    match v {
        Value::String(s) => {
            let citations: Vec<String> = citation_set(s).into_iter().collect();
            json!({
                "description": s,
                "category": "general",
                severity_key: "medium",
                "citations": citations,
            })
        }
        Value::Object(map) => {
            let mut out = map.clone();
            let description = out
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let sev = out
                .get(severity_key)
                .and_then(|v| v.as_str())
                .map(|s| coerce_enum(s, SEVERITY_ENUM, "medium"))
                .unwrap_or_else(|| "medium".to_string());
            out.insert(severity_key.to_string(), json!(sev));
            if !out.contains_key("citations") {
                out.insert(
                    "citations".to_string(),
                    json!(citation_set(&description).into_iter().collect::<Vec<_>>()),
                );
            }
            if !out.contains_key("category") {
                out.insert("category".to_string(), json!("general"));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn placeholder_section(key: &str) -> Value {
    json!({
        "key": key,
        "title": "Not covered in retrieved context",
        "content": "Insufficient retrieved context to populate this section.",
        "citations": Vec::<String>::new(),
    })
}

/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        // Drop null fields.
        map.retain(|_, v| !v.is_null());

        for (key, v) in map.iter_mut() {
            match v {
                Value::Array(arr) if arr.iter().all(|e| e.is_string()) => {
                    if key.eq_ignore_ascii_case("risks") {
                        *v = Value::Array(
                            arr.iter().map(|e| reshape_risk_or_opportunity(e, "severity")).collect(),
                        );
                    } else if key.eq_ignore_ascii_case("opportunities") {
                        *v = Value::Array(
                            arr.iter().map(|e| reshape_risk_or_opportunity(e, "impact")).collect(),
                        );
                    } else if key != "references" {
                        *v = Value::Array(promote_string_array(arr));
                    }
                }
                Value::Array(arr) if key.eq_ignore_ascii_case("risks") => {
                    *v = Value::Array(
                        arr.iter().map(|e| reshape_risk_or_opportunity(e, "severity")).collect(),
                    );
                }
                Value::Array(arr) if key.eq_ignore_ascii_case("opportunities") => {
                    *v = Value::Array(
                        arr.iter().map(|e| reshape_risk_or_opportunity(e, "impact")).collect(),
                    );
                }
                _ if key.eq_ignore_ascii_case("confidence") => {
                    if let Some(c) = clamp_confidence(v) {
                        *v = c;
                    }
                }
                _ => {}
            }
        }

        if let Some(Value::Array(arr)) = map.get_mut("risks") {
            while arr.len() < MIN_RISK_SECTIONS {
                arr.push(placeholder_section("risk"));
            }
        }
        if let Some(Value::Array(arr)) = map.get_mut("opportunities") {
            while arr.len() < MIN_OPPORTUNITY_SECTIONS {
                arr.push(placeholder_section("opportunity"));
            }
        }

        let full_text = serde_json::to_string(&value).unwrap_or_default();
        let refs: BTreeSet<String> = citation_set(&full_text);
        if let Value::Object(ref mut map) = value {
            map.insert("references".to_string(), json!(refs.into_iter().collect::<Vec<_>>()));
        }
    }
    value
}

/// Citations in the output that do not appear in the retrieved context.
pub fn invalid_citations(output_text: &str, context_citations: &BTreeSet<String>) -> Vec<String> {
    citation_set(output_text)
        .into_iter()
        .filter(|c| !context_citations.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let input = json!({
            "risks": ["Customer concentration [D1:p4]"],
            "summary": null,
            "confidence": 150,
        });
        let once = normalize(input);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn drops_null_fields() {
        let input = json!({ "a": 1, "b": null });
        let out = normalize(input);
        assert!(!out.as_object().unwrap().contains_key("b"));
    }

    #[test]
    fn confidence_over_one_treated_as_percentage() {
        let input = json!({ "confidence": 85 });
        let out = normalize(input);
        assert_eq!(out["confidence"], json!(0.85));
    }

    #[test]
    fn references_rebuilt_from_present_citations() {
        let input = json!({ "body": "Revenue rose [D1:p2] and [D1:p2] again." });
        let out = normalize(input);
        assert_eq!(out["references"], json!(["[D1:p2]"]));
    }

    #[test]
    fn invalid_citations_detected() {
        let mut ctx = BTreeSet::new();
        ctx.insert("[D1:p2]".to_string());
        let bad = invalid_citations("See [D1:p2] and [D9:p9]", &ctx);
        assert_eq!(bad, vec!["[D9:p9]".to_string()]);
    }
}
