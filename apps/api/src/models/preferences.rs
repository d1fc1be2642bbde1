use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

pub const DEFAULT_REGION: &str = "Indian";
pub const DEFAULT_MEAL_TYPE: &str = "lunch";
pub const DEFAULT_TIME_AVAILABLE: &str = "60 mins";
pub const DEFAULT_MAX_MINUTES: u32 = 60;

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(hours?|hrs?|minutes?|mins?|h|m)?").unwrap()
});
static OPEN_ENDED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\s*\+").unwrap());

fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
        Null,
    }

    let items = match StringOrVec::deserialize(deserializer)? {
        StringOrVec::String(s) => split_list(&s),
        StringOrVec::Vec(v) => v
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        StringOrVec::Null => Vec::new(),
    };
    Ok(items)
}

/// Comma-separated list, with the literal `None` treated as empty.
fn split_list(s: &str) -> Vec<String> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    s.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Structured preference fields as submitted by the web client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredPreferences {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub taste_preferences: Vec<String>,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub time_available: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub allergies: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub dislikes: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub available_ingredients: Vec<String>,
}

/// Either a structured object or the legacy formatted text block.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PreferencesInput {
    Structured(StructuredPreferences),
    Text(String),
}

impl PreferencesInput {
    pub fn into_preferences(self) -> Preferences {
        match self {
            PreferencesInput::Structured(s) => Preferences::from(s),
            PreferencesInput::Text(text) => Preferences::from_text(&text),
        }
    }
}

/// Canonical preferences record used by every downstream step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    pub region: String,
    pub taste_preferences: Vec<String>,
    pub meal_type: String,
    pub time_available: String,
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub available_ingredients: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            taste_preferences: Vec::new(),
            meal_type: DEFAULT_MEAL_TYPE.to_string(),
            time_available: DEFAULT_TIME_AVAILABLE.to_string(),
            allergies: Vec::new(),
            dislikes: Vec::new(),
            available_ingredients: Vec::new(),
        }
    }
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl From<StructuredPreferences> for Preferences {
    fn from(input: StructuredPreferences) -> Self {
        Self {
            region: non_blank(input.region, DEFAULT_REGION),
            taste_preferences: input.taste_preferences,
            meal_type: non_blank(input.meal_type, DEFAULT_MEAL_TYPE),
            time_available: non_blank(input.time_available, DEFAULT_TIME_AVAILABLE),
            allergies: input.allergies,
            dislikes: input.dislikes,
            available_ingredients: input.available_ingredients,
        }
    }
}

fn labelled_line<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let line = line.trim().trim_start_matches('-').trim_start();
        line.strip_prefix(label)
            .and_then(|rest| rest.trim_start().strip_prefix(':'))
            .map(str::trim)
    })
}

impl Preferences {
    /// Parse the text block produced by [`Preferences::to_prompt_text`].
    /// Missing lines keep their defaults.
    pub fn from_text(text: &str) -> Self {
        let mut prefs = Preferences::default();

        if let Some(region) = labelled_line(text, "Region/Cuisine").filter(|v| !v.is_empty()) {
            prefs.region = region.to_string();
        }
        if let Some(meal) = labelled_line(text, "Meal Type").filter(|v| !v.is_empty()) {
            prefs.meal_type = meal.to_lowercase();
        }
        if let Some(time) = labelled_line(text, "Time Available").filter(|v| !v.is_empty()) {
            prefs.time_available = time.to_string();
        }
        if let Some(tastes) = labelled_line(text, "Taste Preferences") {
            prefs.taste_preferences = split_list(tastes);
        }
        if let Some(allergies) = labelled_line(text, "Allergies") {
            prefs.allergies = split_list(allergies);
        }
        if let Some(dislikes) = labelled_line(text, "Dislikes") {
            prefs.dislikes = split_list(dislikes);
        }
        if let Some(ingredients) = labelled_line(text, "Available Ingredients") {
            prefs.available_ingredients = split_list(ingredients);
        }

        prefs
    }

    /// The paragraph handed to every prompt template.
    pub fn to_prompt_text(&self) -> String {
        fn or_none(items: &[String]) -> String {
            if items.is_empty() {
                "None".to_string()
            } else {
                items.join(", ")
            }
        }

        format!(
            "User Preferences:\n\
             - Region/Cuisine: {}\n\
             - Taste Preferences: {}\n\
             - Meal Type: {}\n\
             - Time Available: {}\n\
             - Allergies: {}\n\
             - Dislikes: {}\n\
             - Available Ingredients: {}\n",
            self.region,
            self.taste_preferences.join(", "),
            self.meal_type,
            self.time_available,
            or_none(&self.allergies),
            or_none(&self.dislikes),
            self.available_ingredients.join(", "),
        )
    }

    pub fn max_time_minutes(&self) -> u32 {
        parse_time_minutes(&self.time_available)
    }
}

/// Convert a free-form time budget ("30 mins", "15-30 minutes", "1 hour",
/// "1 hour 30 mins", "1+ hours") into a ceiling in minutes.
///
/// Each unit-tagged quantity is added to the total. Bare numbers in front of
/// one are the low end of a range and take the larger value with its unit.
pub fn parse_time_minutes(time_available: &str) -> u32 {
    let text = time_available.to_lowercase();

    if OPEN_ENDED.is_match(&text) || text.contains("2 hour") {
        return 120;
    }

    let mut total = 0.0;
    let mut pending: Option<f64> = None;
    for caps in QUANTITY.captures_iter(&text) {
        let Some(value) = caps[1].parse::<f64>().ok() else {
            continue;
        };
        let value = pending.take().map_or(value, |p| p.max(value));
        match caps.get(2).map(|u| u.as_str()) {
            Some(unit) if unit.starts_with('h') => total += value * 60.0,
            Some(_) => total += value,
            None => pending = Some(value),
        }
    }
    total += pending.unwrap_or(0.0);

    if total > 0.0 {
        total.round() as u32
    } else {
        DEFAULT_MAX_MINUTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_minutes() {
        assert_eq!(parse_time_minutes("30 mins"), 30);
        assert_eq!(parse_time_minutes("15-30 minutes"), 30);
        assert_eq!(parse_time_minutes("45"), 45);
        assert_eq!(parse_time_minutes("1 hour"), 60);
        assert_eq!(parse_time_minutes("1.5 hours"), 90);
        assert_eq!(parse_time_minutes("1+ hours"), 120);
        assert_eq!(parse_time_minutes("2 hours"), 120);
        assert_eq!(parse_time_minutes("whenever"), 60);
        assert_eq!(parse_time_minutes(""), 60);
    }

    #[test]
    fn test_compound_durations_are_summed() {
        assert_eq!(parse_time_minutes("1 hour 30 mins"), 90);
        assert_eq!(parse_time_minutes("1 hr 15 min"), 75);
        assert_eq!(parse_time_minutes("1h30"), 90);
        assert_eq!(parse_time_minutes("1-1.5 hours"), 90);
        assert_eq!(parse_time_minutes("20 to 40 minutes"), 40);
    }

    #[test]
    fn test_structured_input_accepts_strings_or_lists() {
        let json = serde_json::json!({
            "region": "Italian",
            "taste_preferences": "Savory, Rich",
            "meal_type": "dinner",
            "time_available": "45 mins",
            "allergies": ["Nuts"],
            "available_ingredients": null
        });
        let input: PreferencesInput = serde_json::from_value(json).unwrap();
        let prefs = input.into_preferences();

        assert_eq!(prefs.region, "Italian");
        assert_eq!(prefs.taste_preferences, vec!["Savory", "Rich"]);
        assert_eq!(prefs.allergies, vec!["Nuts"]);
        assert!(prefs.available_ingredients.is_empty());
        assert!(prefs.dislikes.is_empty());
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let input: PreferencesInput = serde_json::from_value(serde_json::json!({})).unwrap();
        let prefs = input.into_preferences();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_text_block_round_trips() {
        let prefs = Preferences {
            region: "Thai".into(),
            taste_preferences: vec!["Spicy".into(), "Sour".into()],
            meal_type: "dinner".into(),
            time_available: "30 mins".into(),
            allergies: vec![],
            dislikes: vec!["Cilantro".into()],
            available_ingredients: vec!["Rice".into()],
        };

        let text = prefs.to_prompt_text();
        assert!(text.contains("- Allergies: None"));

        let input: PreferencesInput = serde_json::from_value(serde_json::json!(text)).unwrap();
        assert_eq!(input.into_preferences(), prefs);
    }

    #[test]
    fn test_text_meal_type_is_lowercased() {
        let prefs = Preferences::from_text("- Region/Cuisine: Mexican\n- Meal Type: Breakfast");
        assert_eq!(prefs.region, "Mexican");
        assert_eq!(prefs.meal_type, "breakfast");
        assert_eq!(prefs.time_available, DEFAULT_TIME_AVAILABLE);
    }
}
