//! Parsers for model-generated text.
//!
//! Grammar, line by line:
//!
//! * ranked line: optional `**`, a number, `.` or `)`, whitespace, then the
//!   recipe name up to the first spaced dash (` - `, ` – `, ` — `);
//! * step line: optional bullet and `**`, then `step` (any case) and a number;
//! * section header: a short line that is a markdown heading or ends with `:`,
//!   naming ingredients, steps/instructions/method, or tips.
//!
//! Model output is untrusted; nothing here panics on malformed input.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::ParsedRecipe;

static RANKED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\*\*)?\d+[.)]\s+(.+)$").unwrap());
static NAME_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[-–—]\s+").unwrap());
static STEP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:\*\*)?\s*step\s*\d+").unwrap());
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*").unwrap());
static TRAILING_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+-\s+.*$").unwrap());
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Recipe\s+\d+$").unwrap());

const BULLETS: &[char] = &['-', '*', '•', '·', '‣', '◦', '▪', '–', '—'];
const MAX_STEP_CHARS: usize = 200;
const MIN_STEPS: usize = 4;
const FALLBACK_LINE_CHARS: usize = 10;

/// A recipe name pulled out of one numbered line of a ranking reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedName {
    pub line: usize,
    pub name: String,
}

pub fn extract_ranked_names(text: &str) -> Vec<RankedName> {
    text.lines()
        .enumerate()
        .filter_map(|(line, content)| {
            let rest = RANKED_LINE.captures(content)?.get(1)?.as_str();
            let head = NAME_SEPARATOR.split(rest).next().unwrap_or(rest);
            let name = head.trim().trim_matches('*').trim();
            (!name.is_empty()).then(|| RankedName {
                line,
                name: name.to_string(),
            })
        })
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    let without = trimmed.trim_start_matches(|c: char| BULLETS.contains(&c));
    // bold markers are not bullets
    if trimmed.starts_with("**") {
        trimmed
    } else {
        without.trim_start()
    }
}

pub fn is_step_line(line: &str) -> bool {
    STEP_PREFIX.is_match(strip_bullet(line))
}

/// Keep lines that start with a STEP-like prefix. When there are none, fall
/// back to every line longer than ten characters.
pub fn parse_step_lines(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(strip_bullet)
        .filter(|l| !l.is_empty())
        .collect();

    let steps: Vec<String> = lines
        .iter()
        .filter(|l| STEP_PREFIX.is_match(l))
        .map(|l| l.to_string())
        .collect();

    if !steps.is_empty() {
        return steps;
    }

    lines
        .into_iter()
        .filter(|l| l.chars().count() > FALLBACK_LINE_CHARS)
        .map(str::to_string)
        .collect()
}

/// Drop list numbering and a trailing ` - description` from a recipe name.
pub fn clean_recipe_name(name: &str) -> String {
    let name = LEADING_NUMBER.replace(name.trim(), "");
    let name = TRAILING_COMMENT.replace(&name, "");
    name.trim().trim_matches('*').trim().to_string()
}

/// `Recipe 2` and friends: labels that cannot be resolved to a stored row.
pub fn is_placeholder(name: &str) -> bool {
    PLACEHOLDER.is_match(name.trim())
}

pub fn needs_breakdown(steps: &[String]) -> bool {
    steps.len() < MIN_STEPS || steps.iter().any(|s| s.chars().count() > MAX_STEP_CHARS)
}

pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Ingredients,
    Steps,
    Tips,
    Other,
}

fn section_header(line: &str) -> Option<Section> {
    let bare = line.trim_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    if bare.chars().count() > 40 {
        return None;
    }
    if !(line.trim_start().starts_with('#') || bare.ends_with(':')) {
        return None;
    }

    let lower = bare.to_lowercase();
    let section = if lower.contains("ingredient") {
        Section::Ingredients
    } else if ["step", "instruction", "method", "direction"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Section::Steps
    } else if lower.contains("tip") {
        Section::Tips
    } else {
        Section::Other
    };
    Some(section)
}

/// Split a freeform recipe reply into ingredients, steps and tips.
pub fn parse_recipe_sections(text: &str) -> ParsedRecipe {
    let mut section = Section::Other;
    let mut ingredients = Vec::new();
    let mut steps = Vec::new();
    let mut unprefixed_steps = Vec::new();
    let mut tips = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if is_step_line(line) {
            section = Section::Steps;
            steps.push(strip_bullet(line).to_string());
            continue;
        }

        if let Some(next) = section_header(line) {
            section = next;
            continue;
        }

        match section {
            Section::Ingredients => ingredients.push(line.to_string()),
            Section::Tips => tips.push(line.to_string()),
            Section::Steps if line.chars().count() > FALLBACK_LINE_CHARS => {
                unprefixed_steps.push(strip_bullet(line).to_string())
            }
            _ => {}
        }
    }

    ParsedRecipe {
        ingredients: ingredients.join("\n"),
        steps: if steps.is_empty() { unprefixed_steps } else { steps },
        tips: tips.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ranked_names_variants() {
        let text = "Here are my picks:\n\
                    1. Kadai Paneer - Perfect spicy match\n\
                    2) **Chana Masala** – hearty and quick\n\
                    **3. Vegetable Stir-Fry** — uses your veggies\n\
                    Enjoy!";
        let names: Vec<String> = extract_ranked_names(text).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Kadai Paneer", "Chana Masala", "Vegetable Stir-Fry"]);
    }

    #[test]
    fn test_extract_ranked_names_records_line_index() {
        let ranked = extract_ranked_names("intro\n\n1. Dal Tadka");
        assert_eq!(ranked, vec![RankedName { line: 2, name: "Dal Tadka".into() }]);
    }

    #[test]
    fn test_extract_ranked_names_ignores_unnumbered() {
        assert!(extract_ranked_names("- Dal Tadka\nStep 1. Boil").is_empty());
    }

    #[test]
    fn test_parse_step_lines_prefixed() {
        let text = "Here you go:\n\
                    STEP 1: Heat oil in a pan\n\
                    \n\
                      step 2:   Add cumin seeds  \n\
                    • Step 3: Add onions\n\
                    **STEP 4:** Simmer\n\
                    Enjoy your meal!";
        let steps = parse_step_lines(text);
        assert_eq!(
            steps,
            vec![
                "STEP 1: Heat oil in a pan",
                "step 2:   Add cumin seeds",
                "Step 3: Add onions",
                "**STEP 4:** Simmer",
            ]
        );
    }

    #[test]
    fn test_parse_step_lines_falls_back_to_long_lines() {
        let text = "1. Heat the oil well\nok\n- Add the onions and stir\n";
        assert_eq!(
            parse_step_lines(text),
            vec!["1. Heat the oil well", "Add the onions and stir"]
        );
    }

    #[test]
    fn test_steps_header_is_not_a_step() {
        assert!(!is_step_line("Steps:"));
        assert!(is_step_line("- STEP 10: Garnish"));
    }

    #[test]
    fn test_parse_step_lines_empty_input() {
        assert!(parse_step_lines("").is_empty());
        assert!(parse_step_lines("\n  \n").is_empty());
    }

    #[test]
    fn test_clean_recipe_name() {
        assert_eq!(clean_recipe_name("1. Kadai Paneer - spicy and rich"), "Kadai Paneer");
        assert_eq!(clean_recipe_name("  Vegetable Stir-Fry "), "Vegetable Stir-Fry");
        assert_eq!(clean_recipe_name("2. **Dal Tadka**"), "Dal Tadka");
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("Recipe 2"));
        assert!(is_placeholder("recipe   12"));
        assert!(!is_placeholder("Recipe 2 Curry"));
        assert!(!is_placeholder("Paneer Recipe"));
    }

    #[test]
    fn test_needs_breakdown() {
        let short: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert!(needs_breakdown(&short));

        let fine: Vec<String> = (0..5).map(|i| format!("Step {}", i)).collect();
        assert!(!needs_breakdown(&fine));

        let mut long = fine.clone();
        long[2] = "x".repeat(201);
        assert!(needs_breakdown(&long));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  [] "), "[]");
    }

    #[test]
    fn test_parse_recipe_sections() {
        let text = "## Masala Omelette\n\
                    **Ingredients:**\n\
                    - 2 eggs\n\
                    - 1 onion, chopped\n\
                    Instructions:\n\
                    STEP 1: Whisk the eggs with salt\n\
                    STEP 2: Fry the onion until soft\n\
                    Cooking Tips:\n\
                    Use a non-stick pan.\n\
                    Total time: 15 minutes";
        let parsed = parse_recipe_sections(text);
        assert_eq!(parsed.ingredients, "- 2 eggs\n- 1 onion, chopped");
        assert_eq!(parsed.steps.len(), 2);
        assert!(parsed.steps[1].starts_with("STEP 2"));
        assert_eq!(parsed.tips, "Use a non-stick pan.\nTotal time: 15 minutes");
    }

    #[test]
    fn test_parse_recipe_sections_numbered_instructions() {
        let text = "Ingredients:\n- rice\nMethod:\n1. Rinse the rice well\n2. Boil in salted water";
        let parsed = parse_recipe_sections(text);
        assert_eq!(parsed.steps, vec!["1. Rinse the rice well", "2. Boil in salted water"]);
        assert_eq!(parsed.ingredients, "- rice");
    }
}
