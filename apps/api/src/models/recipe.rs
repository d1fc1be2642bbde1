use serde::{Deserialize, Deserializer, Serialize};

fn deserialize_amount<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Int(i64),
        Float(f64),
        Null,
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
        StringOrNumber::Null => String::new(),
    })
}

/// Ingredient as stored in the catalog's JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogIngredient {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: String,
    #[serde(default)]
    pub optional: bool,
}

/// A catalog row considered for recommendation, with its computed match score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub cuisine_type: String,
    pub meal_type: Vec<String>,
    pub prep_time_minutes: Option<i32>,
    pub cooking_time_minutes: Option<i32>,
    pub total_time_minutes: i32,
    pub difficulty: String,
    pub servings: Option<i32>,
    pub taste_profile: Vec<String>,
    pub allergens: Vec<String>,
    pub dietary_tags: Vec<String>,
    pub ingredients: Vec<CatalogIngredient>,
    pub popularity_score: f64,
    pub match_score: f64,
}

impl Candidate {
    /// One entry of the numbered list shown to the ranking model.
    pub fn summary_line(&self, position: usize) -> String {
        let ingredients = self
            .ingredients
            .iter()
            .take(5)
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{}. {}\n   - Time: {} mins ({})\n   - Taste: {}\n   - Ingredients: {}",
            position,
            self.name,
            self.total_time_minutes,
            self.difficulty,
            self.taste_profile.join(", "),
            ingredients
        )
    }
}

/// Full catalog recipe used for the detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<CatalogIngredient>,
    pub steps: Vec<String>,
    pub tips: String,
    pub prep_time_minutes: Option<i32>,
    pub cooking_time_minutes: Option<i32>,
    pub total_time_minutes: Option<i32>,
    pub difficulty: Option<String>,
    pub servings: Option<i32>,
}

/// Ingredients, steps and tips ready to be stored on a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedRecipe {
    pub ingredients: String,
    pub steps: Vec<String>,
    pub tips: String,
}

pub fn format_ingredients(ingredients: &[CatalogIngredient]) -> String {
    ingredients
        .iter()
        .map(|ing| {
            let mut line = format!("- {} {}", ing.amount, ing.name);
            if ing.optional {
                line.push_str(" (optional)");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_amount_accepts_numbers() {
        let json = serde_json::json!([
            {"name": "Paneer", "amount": "200g"},
            {"name": "Chillies", "amount": 2, "optional": true},
            {"name": "Salt"}
        ]);
        let ingredients: Vec<CatalogIngredient> = serde_json::from_value(json).unwrap();
        assert_eq!(ingredients[1].amount, "2");
        assert_eq!(ingredients[2].amount, "");

        assert_eq!(
            format_ingredients(&ingredients),
            "- 200g Paneer\n- 2 Chillies (optional)\n-  Salt"
        );
    }
}
