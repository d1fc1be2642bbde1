//! Maps the names a ranking model wrote back onto the catalog's canonical names.

use similar::TextDiff;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::llm_text::extract_ranked_names;

pub const MATCH_CUTOFF: f32 = 0.6;
pub const MAX_PICKS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The reply with matched names rewritten; same line count as the input.
    pub text: String,
    /// `"Recipe N"` -> canonical name, one entry per extracted line (max 3).
    pub mapping: BTreeMap<String, String>,
}

pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Closest allow-listed name scoring at least `cutoff`; earlier names win ties.
pub fn closest_match<'a>(name: &str, allowed: &'a [String], cutoff: f32) -> Option<&'a str> {
    allowed
        .iter()
        .map(|candidate| (similarity(name, candidate), candidate))
        .filter(|(score, _)| *score >= cutoff)
        .fold(None, |best: Option<(f32, &String)>, (score, candidate)| match best {
            Some((best_score, _)) if best_score >= score => best,
            _ => Some((score, candidate)),
        })
        .map(|(_, candidate)| candidate.as_str())
}

pub fn reconcile(text: &str, allowed: &[String]) -> Reconciliation {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let mut mapping = BTreeMap::new();

    for (i, ranked) in extract_ranked_names(text).into_iter().take(MAX_PICKS).enumerate() {
        let label = format!("Recipe {}", i + 1);

        match closest_match(&ranked.name, allowed, MATCH_CUTOFF) {
            Some(canonical) => {
                if canonical != ranked.name {
                    if let Some(line) = lines.get_mut(ranked.line) {
                        *line = line.replacen(&ranked.name, canonical, 1);
                    }
                }
                debug!("Matched '{}' -> '{}' ({})", ranked.name, canonical, label);
                mapping.insert(label, canonical.to_string());
            }
            None => {
                let fallback = allowed.get(i).cloned().unwrap_or_else(|| ranked.name.clone());
                warn!(
                    "No close match for '{}', falling back to '{}' ({})",
                    ranked.name, fallback, label
                );
                mapping.insert(label, fallback);
            }
        }
    }

    Reconciliation {
        text: lines.join("\n"),
        mapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["Kadai Paneer", "Chana Masala", "Aloo Gobi", "Dal Tadka"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_exact_names_leave_text_unchanged() {
        let text = "1. Kadai Paneer - spicy\n2. Aloo Gobi - quick\n3. Dal Tadka - comforting";
        let result = reconcile(text, &allowed());

        assert_eq!(result.text, text);
        assert_eq!(result.mapping["Recipe 1"], "Kadai Paneer");
        assert_eq!(result.mapping["Recipe 2"], "Aloo Gobi");
        assert_eq!(result.mapping["Recipe 3"], "Dal Tadka");
    }

    #[test]
    fn test_near_miss_is_rewritten_in_place() {
        let text = "Top picks:\n1. Kadhai Paneer - spicy\n\n2. Chana Masaala - hearty\n";
        let result = reconcile(text, &allowed());

        assert_eq!(
            result.text,
            "Top picks:\n1. Kadai Paneer - spicy\n\n2. Chana Masala - hearty\n"
        );
        assert_eq!(result.text.lines().count(), text.lines().count());
        assert_eq!(result.mapping.len(), 2);
        assert_eq!(result.mapping["Recipe 2"], "Chana Masala");
    }

    #[test]
    fn test_placeholder_falls_back_to_position() {
        let text = "1. Recipe 1 - first\n2. Recipe 2 - second";
        let result = reconcile(text, &allowed());

        assert_eq!(result.text, text);
        assert_eq!(result.mapping["Recipe 1"], "Kadai Paneer");
        assert_eq!(result.mapping["Recipe 2"], "Chana Masala");
    }

    #[test]
    fn test_only_first_three_lines_are_mapped() {
        let text = "1. Aloo Gobi\n2. Dal Tadka\n3. Chana Masala\n4. Kadai Paneer";
        let result = reconcile(text, &allowed());
        assert_eq!(result.mapping.len(), 3);
        assert!(!result.mapping.contains_key("Recipe 4"));
    }

    #[test]
    fn test_fallback_without_candidates_keeps_model_name() {
        let result = reconcile("1. Mystery Stew - ?", &[]);
        assert_eq!(result.mapping["Recipe 1"], "Mystery Stew");
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert!(similarity("Kadhai Paneer", "Kadai Paneer") > MATCH_CUTOFF);
        assert!(similarity("Recipe 2", "Chana Masala") < MATCH_CUTOFF);
    }
}
