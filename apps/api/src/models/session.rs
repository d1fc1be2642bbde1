use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use super::recipe::ParsedRecipe;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub step_number: usize,
    pub step_text: String,
    pub timestamp: DateTime<Utc>,
    pub image_generated: bool,
    pub image_prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    NotStarted,
    InProgress,
    Completed,
}

/// Outcome of advancing the step cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAdvance {
    Step {
        number: usize,
        text: String,
        total: usize,
    },
    Completed {
        total: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("No recipe loaded")]
    NoRecipe,
    #[error("No more steps")]
    NoMoreSteps,
}

/// Server-side state of one user's recipe walkthrough.
///
/// `current_step_index` is a cursor: 0 before the first step, `1..=len` while
/// cooking, `len + 1` once completed or skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub preferences: String,
    pub current_recipe: Option<String>,
    pub current_step_index: usize,
    pub recipe_steps: Vec<String>,
    pub recipe_history: Vec<HistoryEntry>,
    pub recipe_mapping: BTreeMap<String, String>,
    pub ingredients: String,
    pub tips: String,
}

impl Session {
    pub fn new(preferences: String) -> Self {
        Self {
            preferences,
            ..Default::default()
        }
    }

    pub fn total_steps(&self) -> usize {
        self.recipe_steps.len()
    }

    pub fn state(&self) -> StepState {
        match self.current_step_index {
            0 => StepState::NotStarted,
            i if i <= self.total_steps() => StepState::InProgress,
            _ => StepState::Completed,
        }
    }

    /// Replace the loaded recipe. Steps, cursor and history start over.
    pub fn load_recipe(&mut self, name: &str, recipe: ParsedRecipe) {
        self.current_recipe = Some(name.to_string());
        self.recipe_steps = recipe.steps;
        self.ingredients = recipe.ingredients;
        self.tips = recipe.tips;
        self.current_step_index = 0;
        self.recipe_history.clear();
    }

    pub fn advance(&mut self) -> Result<StepAdvance, StepError> {
        let total = self.total_steps();
        if total == 0 {
            return Err(StepError::NoRecipe);
        }

        let cursor = self.current_step_index;
        if cursor >= total {
            self.current_step_index = total + 1;
            return Ok(StepAdvance::Completed { total });
        }

        let text = self.recipe_steps[cursor].clone();
        self.current_step_index = cursor + 1;
        self.recipe_history.push(HistoryEntry {
            step_number: cursor + 1,
            step_text: text.clone(),
            timestamp: Utc::now(),
            image_generated: false,
            image_prompt: None,
        });

        Ok(StepAdvance::Step {
            number: cursor + 1,
            text,
            total,
        })
    }

    pub fn skip(&mut self) {
        self.current_step_index = self.total_steps() + 1;
    }

    /// The step an image should illustrate: the current one, or the first if
    /// the walk has not started.
    pub fn image_step(&self) -> Result<(usize, &str), StepError> {
        if self.recipe_steps.is_empty() {
            return Err(StepError::NoRecipe);
        }
        let index = self.current_step_index.max(1);
        self.recipe_steps
            .get(index - 1)
            .map(|step| (index, step.as_str()))
            .ok_or(StepError::NoMoreSteps)
    }

    /// Flag the latest history entry if it belongs to `step_number`.
    pub fn mark_image(&mut self, step_number: usize, prompt: &str) {
        if let Some(last) = self.recipe_history.last_mut() {
            if last.step_number == step_number {
                last.image_generated = true;
                last.image_prompt = Some(prompt.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_steps(n: usize) -> Session {
        let mut session = Session::new("prefs".into());
        session.load_recipe(
            "Dal Tadka",
            ParsedRecipe {
                ingredients: "- 1 cup Dal".into(),
                steps: (1..=n).map(|i| format!("STEP {}: do thing {}", i, i)).collect(),
                tips: "Serve hot".into(),
            },
        );
        session
    }

    #[test]
    fn test_walk_reaches_completion_once() {
        let mut session = session_with_steps(3);
        assert_eq!(session.state(), StepState::NotStarted);

        for expected in 1..=3 {
            match session.advance().unwrap() {
                StepAdvance::Step { number, total, .. } => {
                    assert_eq!(number, expected);
                    assert_eq!(total, 3);
                }
                other => panic!("expected a step, got {:?}", other),
            }
        }
        assert_eq!(session.state(), StepState::InProgress);
        assert_eq!(session.recipe_history.len(), 3);

        assert_eq!(session.advance().unwrap(), StepAdvance::Completed { total: 3 });
        assert_eq!(session.state(), StepState::Completed);
        assert_eq!(session.recipe_history.len(), 3);

        assert_eq!(session.advance().unwrap(), StepAdvance::Completed { total: 3 });
        assert_eq!(session.current_step_index, 4);
        assert_eq!(session.recipe_history.len(), 3);
    }

    #[test]
    fn test_advance_without_recipe_fails() {
        let mut session = Session::new("prefs".into());
        assert_eq!(session.advance(), Err(StepError::NoRecipe));
    }

    #[test]
    fn test_skip_jumps_to_completed() {
        let mut session = session_with_steps(4);
        session.advance().unwrap();
        session.skip();
        assert_eq!(session.state(), StepState::Completed);
        assert_eq!(session.image_step(), Err(StepError::NoMoreSteps));
    }

    #[test]
    fn test_image_step_defaults_to_first() {
        let mut session = session_with_steps(2);
        assert_eq!(session.image_step().unwrap().0, 1);

        session.advance().unwrap();
        session.advance().unwrap();
        let (index, text) = session.image_step().unwrap();
        assert_eq!(index, 2);
        assert!(text.starts_with("STEP 2"));

        session.mark_image(index, "overhead shot");
        let last = session.recipe_history.last().unwrap();
        assert!(last.image_generated);
        assert_eq!(last.image_prompt.as_deref(), Some("overhead shot"));
    }

    #[test]
    fn test_mark_image_ignores_other_steps() {
        let mut session = session_with_steps(2);
        session.advance().unwrap();
        session.mark_image(2, "prompt");
        assert!(!session.recipe_history[0].image_generated);
    }

    #[test]
    fn test_load_recipe_resets_walk() {
        let mut session = session_with_steps(2);
        session.advance().unwrap();
        session.load_recipe("Other", ParsedRecipe::default());
        assert_eq!(session.current_step_index, 0);
        assert!(session.recipe_history.is_empty());
        assert_eq!(session.current_recipe.as_deref(), Some("Other"));
    }
}
