//! Text encoding of the denormalised `top_recipes` table.
//!
//! | column            | format                                   |
//! |-------------------|------------------------------------------|
//! | `tastes`          | `Spicy:4|Savory:5`                       |
//! | `meal_types`, ... | `Lunch|Dinner`                           |
//! | `ingredients`     | one `qty|unit|name|note` line per item   |
//! | `steps`           | steps joined by `<STEP_DELIMITER>`       |
//! | `step_image_urls` | urls joined by `<STEP_DELIMITER>`        |
//!
//! A NULL or empty column decodes to an empty list.

use thiserror::Error;

use crate::models::{Ingredient, Taste};

pub const STEP_DELIMITER: &str = "<STEP_DELIMITER>";
pub const DIFFICULTIES: [&str; 3] = ["Easy", "Medium", "Hard"];

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("Difficulty must be one of Easy, Medium, Hard, got '{0}'")]
    InvalidDifficulty(String),

    #[error("Rating must be 0-5, got {0}")]
    InvalidRating(f64),

    #[error("Taste intensity must be 1-5, got {intensity} for '{name}'")]
    InvalidIntensity { name: String, intensity: i64 },

    #[error("Field '{field}' may not contain '{delimiter}': {value}")]
    EmbeddedDelimiter {
        field: &'static str,
        delimiter: &'static str,
        value: String,
    },
}

pub fn validate_difficulty(difficulty: &str) -> Result<(), CodecError> {
    if DIFFICULTIES.contains(&difficulty) {
        Ok(())
    } else {
        Err(CodecError::InvalidDifficulty(difficulty.to_string()))
    }
}

pub fn validate_rating(rating: f64) -> Result<(), CodecError> {
    if (0.0..=5.0).contains(&rating) {
        Ok(())
    } else {
        Err(CodecError::InvalidRating(rating))
    }
}

fn reject_delimiter(field: &'static str, value: &str, delimiter: &'static str) -> Result<(), CodecError> {
    if value.contains(delimiter) {
        return Err(CodecError::EmbeddedDelimiter {
            field,
            delimiter,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub fn encode_tastes(tastes: &[Taste]) -> Result<String, CodecError> {
    let mut parts = Vec::with_capacity(tastes.len());
    for taste in tastes {
        if !(1..=5).contains(&taste.intensity) {
            return Err(CodecError::InvalidIntensity {
                name: taste.name.clone(),
                intensity: taste.intensity,
            });
        }
        reject_delimiter("tastes", &taste.name, "|")?;
        reject_delimiter("tastes", &taste.name, ":")?;
        parts.push(format!("{}:{}", taste.name, taste.intensity));
    }
    Ok(parts.join("|"))
}

/// Entries that are not `name:int` are skipped.
pub fn decode_tastes(column: Option<&str>) -> Vec<Taste> {
    let Some(column) = column.filter(|c| !c.is_empty()) else {
        return Vec::new();
    };

    column
        .split('|')
        .filter_map(|entry| {
            let (name, intensity) = entry.split_once(':')?;
            Some(Taste {
                name: name.trim().to_string(),
                intensity: intensity.trim().parse().ok()?,
            })
        })
        .collect()
}

pub fn encode_list(field: &'static str, items: &[String]) -> Result<String, CodecError> {
    for item in items {
        reject_delimiter(field, item, "|")?;
    }
    Ok(items.join("|"))
}

/// Exact split: padding and empty items survive a round trip.
pub fn decode_list(column: Option<&str>) -> Vec<String> {
    match column {
        None | Some("") => Vec::new(),
        Some(column) => column.split('|').map(str::to_string).collect(),
    }
}

pub fn encode_ingredients(ingredients: &[Ingredient]) -> Result<String, CodecError> {
    let mut lines = Vec::with_capacity(ingredients.len());
    for ing in ingredients {
        for value in [&ing.quantity, &ing.unit, &ing.name, &ing.preparation_note] {
            reject_delimiter("ingredients", value, "|")?;
            reject_delimiter("ingredients", value, "\n")?;
        }
        lines.push(format!(
            "{}|{}|{}|{}",
            ing.quantity, ing.unit, ing.name, ing.preparation_note
        ));
    }
    Ok(lines.join("\n"))
}

/// Lines with fewer than three fields are skipped; the note is optional.
/// Field values are taken verbatim.
pub fn decode_ingredients(column: Option<&str>) -> Vec<Ingredient> {
    column
        .unwrap_or_default()
        .split('\n')
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 3 {
                return None;
            }
            Some(Ingredient {
                quantity: parts[0].to_string(),
                unit: parts[1].to_string(),
                name: parts[2].to_string(),
                preparation_note: parts.get(3).map(|n| n.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

pub fn encode_steps(field: &'static str, steps: &[String]) -> Result<String, CodecError> {
    for step in steps {
        reject_delimiter(field, step, STEP_DELIMITER)?;
    }
    Ok(steps.join(STEP_DELIMITER))
}

/// Exact split: empty entries between delimiters are preserved.
pub fn decode_steps(column: Option<&str>) -> Vec<String> {
    match column {
        None | Some("") => Vec::new(),
        Some(column) => column.split(STEP_DELIMITER).map(str::to_string).collect(),
    }
}

/// Pad with empty strings or truncate so there is one image slot per step.
pub fn fit_step_images(mut images: Vec<String>, step_count: usize) -> Vec<String> {
    images.resize(step_count, String::new());
    images
}
