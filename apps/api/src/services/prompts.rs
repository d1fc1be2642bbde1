//! Prompt builders. Each returns a [`Prompt`] ready for [`LanguageModel::complete`].
//!
//! [`LanguageModel::complete`]: super::llm::LanguageModel::complete

use super::llm::Prompt;

const RECIPE_FORMAT: &str = "For each recipe, provide:
1. Recipe Name
2. Brief description (1-2 sentences)
3. Main ingredients needed
4. Estimated cooking time
5. Why it matches their preferences";

const DETAIL_FORMAT: &str = "Provide:
1. Complete ingredient list with quantities
2. Clear step-by-step cooking instructions (numbered - EACH STEP ON A NEW LINE starting with \"STEP X:\")
3. Cooking tips
4. Total time required";

pub fn ranking(preferences: &str, recipes: &str, count: usize, available_names: &[String]) -> Prompt {
    let names = available_names
        .iter()
        .map(|n| format!("- {}", n))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        "You are an expert chef who matches recipes to people. You only ever recommend \
         recipes from the list you are given.",
        format!(
            "{preferences}

Here are {count} candidate recipes:

{recipes}

Pick the 3 best matches for these preferences, best first.

Available recipe names (copy them EXACTLY):
{names}

Reply with exactly 3 lines in this format:
1. <exact recipe name> - <one sentence on why it fits>
2. <exact recipe name> - <one sentence on why it fits>
3. <exact recipe name> - <one sentence on why it fits>

Do not write \"Recipe 1\" or any other placeholder instead of a name."
        ),
    )
}

pub fn step_breakdown(recipe_name: &str, instructions: &str) -> Prompt {
    Prompt::new(
        "You are an expert chef who writes clear, beginner-friendly cooking steps.",
        format!(
            "Rewrite the instructions for {recipe_name} as short, single-action steps.

Original instructions:
{instructions}

Rules:
- Each step on its own line, starting with \"STEP 1:\", \"STEP 2:\", etc.
- One action per step, at most two sentences
- Keep every quantity, temperature and time from the original
- No introduction or closing remarks"
        ),
    )
}

pub fn recommend(preferences: &str, context: Option<&str>) -> Prompt {
    match context {
        Some(context) => Prompt::new(
            "You are an expert chef and nutritionist. Based on the user's preferences and the \
             recipe knowledge base, recommend 3 suitable recipes.",
            format!(
                "Recipe Knowledge Base:
{context}

{preferences}

{RECIPE_FORMAT}

IMPORTANT: Prioritize recipes from the knowledge base above. If the knowledge base doesn't have suitable recipes, you may suggest alternatives.
Format your response clearly with numbered recipes."
            ),
        ),
        None => Prompt::new(
            "You are an expert chef and nutritionist.",
            format!(
                "Based on the user's preferences below, recommend 3 suitable recipes.

{preferences}

{RECIPE_FORMAT}

Format your response clearly with numbered recipes."
            ),
        ),
    }
}

pub fn detail(recipe_name: &str, preferences: &str, context: Option<&str>) -> Prompt {
    match context {
        Some(context) => Prompt::new(
            "You are an expert chef. Provide detailed step-by-step recipes.",
            format!(
                "Provide a detailed step-by-step recipe for: {recipe_name}

Recipe Knowledge Base:
{context}

User preferences and constraints:
{preferences}

{DETAIL_FORMAT}

IMPORTANT: If the recipe is found in the knowledge base above, use that information. Otherwise, create a suitable recipe.
Format each cooking step on a new line starting with \"STEP 1:\", \"STEP 2:\", etc.
Make the instructions clear and easy to follow."
            ),
        ),
        None => Prompt::new(
            "You are an expert chef.",
            format!(
                "Provide a detailed step-by-step recipe for: {recipe_name}

User preferences and constraints:
{preferences}

{DETAIL_FORMAT}

IMPORTANT: Format each cooking step on a new line starting with \"STEP 1:\", \"STEP 2:\", etc.
Make the instructions clear and easy to follow."
            ),
        ),
    }
}

pub fn alternatives(missing_ingredient: &str, recipe_context: &str) -> Prompt {
    Prompt::new(
        "You are an expert chef who suggests ingredient alternatives.",
        format!(
            "Suggest 3 good alternatives for the ingredient: {missing_ingredient}

Recipe context: {recipe_context}

For each alternative, explain:
- What it is
- How to use it as a substitute
- How it will affect the taste

Keep suggestions practical and commonly available."
        ),
    )
}

pub fn image(recipe_name: &str, step_description: &str) -> Prompt {
    Prompt::new(
        "You are an expert at creating concise, effective image generation prompts for food photography.",
        format!(
            "Create a SHORT image generation prompt (max 60 words):

Recipe: {recipe_name}
Step: {step_description}

Make it:
- Professional food photography style
- Clear and specific about the cooking action
- Include lighting, angle, and composition details
- Photorealistic, appetizing, high quality
- NO explanations, just the prompt

Example: \"Professional overhead shot of golden pakoras frying in hot oil, bubbles rising, warm kitchen lighting, shallow depth of field, steam visible, highly detailed, food photography\"

Your prompt:"
        ),
    )
}

pub fn generate_batch(region: &str, batch_num: usize, existing_count: usize) -> Prompt {
    Prompt::new(
        "You are a culinary expert who returns strictly valid JSON.",
        format!(
            r#"Generate exactly 10 unique, authentic, and popular {region} recipes.

IMPORTANT REQUIREMENTS:
1. Each recipe MUST be genuinely traditional or popular in {region} cuisine
2. Ensure variety in cooking methods, ingredients, and dish types
3. Include both classic favorites and some lesser-known authentic dishes
4. Make descriptions engaging and informative (100-150 words)
5. All data must be realistic and accurate

This is batch {batch_num}, we already have {existing_count} recipes, so generate DIFFERENT recipes.

Return ONLY a valid JSON array with NO additional text or markdown. Use this exact structure:

[
  {{
    "name": "Exact recipe name",
    "description": "Detailed description of the dish, its origin and flavor profile",
    "cuisine": "{region}",
    "prep_time_minutes": 20,
    "cook_time_minutes": 30,
    "total_time_minutes": 50,
    "servings": 4,
    "difficulty": "Easy|Medium|Hard",
    "tastes": ["Primary", "Secondary"],
    "meal_types": ["Breakfast|Lunch|Dinner|Snack|Dessert"],
    "dietary_tags": ["Vegetarian", "Vegan", "Non-Vegetarian", "Gluten-Free"],
    "ingredients": [
      {{"name": "ingredient name", "quantity": "2", "unit": "cups", "preparation": "chopped"}}
    ],
    "instructions": ["Step 1: ...", "Step 2: ...", "Step 3: ..."],
    "calories": 350,
    "rating": 4.5
  }}
]

Available tastes: Sweet, Spicy, Savory, Sour, Tangy, Mild, Rich
Available meal types: Breakfast, Lunch, Dinner, Snack, Dessert
Available difficulty levels: Easy, Medium, Hard

Return ONLY the JSON array, no other text."#
        ),
    )
}
