//! Post-generation gate: is the generated recipe good enough to persist?

use crate::schema::GeneratedRecipe;

#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputValidationConfig {
    pub(crate) min_ingredients: usize,
    pub(crate) min_instructions: usize,
    pub(crate) max_placeholder_ratio: f64,
    pub(crate) min_quality_score: u8,
}

impl Default for OutputValidationConfig {
    fn default() -> Self {
        Self {
            min_ingredients: 2,
            min_instructions: 2,
            max_placeholder_ratio: 0.2,
            min_quality_score: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecipeValidationResult {
    pub(crate) is_valid: bool,
    pub(crate) quality_score: u8,
    pub(crate) has_placeholders: bool,
    pub(crate) issues: Vec<String>,
}

const PLACEHOLDER_TOKENS: &[&str] = &["n/a", "na", "unknown", "not specified", "tbd", "xxx"];

/// Matches LLM filler like "N/A", "[unknown]" or "<TBD>".
pub(crate) fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    let lower = trimmed.to_lowercase();
    if PLACEHOLDER_TOKENS.contains(&lower.as_str()) {
        return true;
    }

    (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('<') && trimmed.ends_with('>'))
}

fn placeholder_ratio<'a>(texts: impl Iterator<Item = &'a str>) -> (f64, usize) {
    let mut total = 0usize;
    let mut placeholders = 0usize;
    for text in texts {
        total += 1;
        if is_placeholder(text) {
            placeholders += 1;
        }
    }
    if total == 0 {
        (0.0, 0)
    } else {
        (placeholders as f64 / total as f64, placeholders)
    }
}

/// Score the recipe on a 0–100 scale and decide whether it may be persisted.
///
/// A recipe is valid when the score clears the threshold AND no hard minimum
/// is violated. A placeholder ratio at or above the configured maximum is a
/// hard violation.
pub(crate) fn validate_recipe(
    recipe: &GeneratedRecipe,
    config: OutputValidationConfig,
) -> RecipeValidationResult {
    let mut score: i32 = 100;
    let mut issues = Vec::new();
    let mut has_placeholders = false;
    let mut hard_violation = false;

    if is_placeholder(&recipe.recipe.recipe_name) {
        score -= 25;
        has_placeholders = has_placeholders || !recipe.recipe.recipe_name.trim().is_empty();
        issues.push("Recipe name is missing or a placeholder".to_string());
    }

    if is_placeholder(&recipe.recipe.description) {
        score -= 15;
        has_placeholders = has_placeholders || !recipe.recipe.description.trim().is_empty();
        issues.push("Description is missing or a placeholder".to_string());
    }

    if recipe.ingredients.len() < config.min_ingredients {
        score -= 25;
        hard_violation = true;
        issues.push(format!(
            "Too few ingredients ({} < {})",
            recipe.ingredients.len(),
            config.min_ingredients
        ));
    }

    if recipe.instructions.len() < config.min_instructions {
        score -= 25;
        hard_violation = true;
        issues.push(format!(
            "Too few instructions ({} < {})",
            recipe.instructions.len(),
            config.min_instructions
        ));
    }

    let (ingredient_ratio, ingredient_placeholders) =
        placeholder_ratio(recipe.ingredients.iter().map(|i| i.name.as_str()));
    if !recipe.ingredients.is_empty() && ingredient_ratio >= config.max_placeholder_ratio {
        score -= 10;
        hard_violation = true;
        has_placeholders = has_placeholders || ingredient_placeholders > 0;
        issues.push(format!(
            "{ingredient_placeholders} ingredient name(s) look like placeholders"
        ));
    }

    let (instruction_ratio, instruction_placeholders) =
        placeholder_ratio(recipe.instructions.iter().map(|i| i.instruction.as_str()));
    if !recipe.instructions.is_empty() && instruction_ratio >= config.max_placeholder_ratio {
        score -= 10;
        hard_violation = true;
        has_placeholders = has_placeholders || instruction_placeholders > 0;
        issues.push(format!(
            "{instruction_placeholders} instruction(s) look like placeholders"
        ));
    }

    if recipe.cuisine_categories.is_empty() && recipe.meal_types.is_empty() {
        score -= 5;
        issues.push("No cuisine or meal-type categories".to_string());
    }

    if recipe.nutrition.is_all_zero() {
        score -= 5;
        issues.push("Nutrition block is all zero".to_string());
    }

    let quality_score = score.clamp(0, 100) as u8;

    RecipeValidationResult {
        is_valid: quality_score >= config.min_quality_score && !hard_violation,
        quality_score,
        has_placeholders,
        issues,
    }
}
