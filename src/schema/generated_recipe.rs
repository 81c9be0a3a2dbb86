//! Wire schema for the recipe the LLM is asked to produce.
//!
//! The models here are deliberately tolerant: optional numerics treat JSON
//! `null` and a missing key the same way, and quantities accept either a
//! JSON number or a string, because different providers disagree on which
//! one they emit.

use serde::{Deserialize, Serialize};

/// A quantity as emitted by the model: `2`, `0.5` or `"1/2"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuantityValue {
    Number(f64),
    Text(String),
}

impl QuantityValue {
    /// Normalized text form used at persistence time.
    pub(crate) fn as_text(&self) -> String {
        match self {
            Self::Number(value) => format_number(*value),
            Self::Text(text) => text.trim().to_string(),
        }
    }

    /// Numeric value where one can be recovered; zero otherwise.
    pub(crate) fn as_f64(&self) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse().unwrap_or(0.0),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Text(text) => text.trim().is_empty(),
        }
    }
}

/// Whole numbers render without a decimal point, everything else with two
/// decimals.
pub(crate) fn format_number(value: f64) -> String {
    if value == 0.0 {
        return String::new();
    }
    if (value - value.trunc()).abs() < f64::EPSILON {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RecipeHeader {
    #[serde(default)]
    pub(crate) recipe_name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) prep_time: Option<i32>,
    #[serde(default)]
    pub(crate) cooking_time: Option<i32>,
    #[serde(default)]
    pub(crate) total_time: Option<i32>,
    #[serde(default, rename = "original_serving_size")]
    pub(crate) original_servings: Option<i32>,
    #[serde(default)]
    pub(crate) difficulty_rating: Option<i16>,
    #[serde(default)]
    pub(crate) focused_diet: String,
    #[serde(default)]
    pub(crate) estimated_calories: Option<i32>,
    #[serde(default)]
    pub(crate) language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeneratedIngredient {
    #[serde(default)]
    pub(crate) original_quantity: Option<QuantityValue>,
    #[serde(default)]
    pub(crate) original_unit: String,
    #[serde(default)]
    pub(crate) quantity: Option<QuantityValue>,
    #[serde(default)]
    pub(crate) unit: String,
    pub(crate) name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeneratedInstruction {
    #[serde(default)]
    pub(crate) step_number: i32,
    pub(crate) instruction: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct GeneratedNutrition {
    #[serde(default)]
    pub(crate) protein: f64,
    #[serde(default)]
    pub(crate) carbs: f64,
    #[serde(default)]
    pub(crate) fat: f64,
    #[serde(default)]
    pub(crate) fiber: f64,
}

impl GeneratedNutrition {
    pub(crate) fn is_all_zero(&self) -> bool {
        self.protein == 0.0 && self.carbs == 0.0 && self.fat == 0.0 && self.fiber == 0.0
    }
}

/// The full structured answer the generation providers must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeneratedRecipe {
    pub(crate) recipe: RecipeHeader,
    #[serde(default)]
    pub(crate) ingredients: Vec<GeneratedIngredient>,
    #[serde(default)]
    pub(crate) instructions: Vec<GeneratedInstruction>,
    #[serde(default)]
    pub(crate) nutrition: GeneratedNutrition,
    #[serde(default)]
    pub(crate) cuisine_categories: Vec<String>,
    #[serde(default)]
    pub(crate) meal_types: Vec<String>,
    #[serde(default)]
    pub(crate) occasions: Vec<String>,
    #[serde(default)]
    pub(crate) dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub(crate) equipment: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_accepts_numbers_and_strings() {
        let number: QuantityValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(number.as_text(), "2.50");
        assert!((number.as_f64() - 2.5).abs() < f64::EPSILON);

        let whole: QuantityValue = serde_json::from_str("3").unwrap();
        assert_eq!(whole.as_text(), "3");

        let text: QuantityValue = serde_json::from_str("\"1/2\"").unwrap();
        assert_eq!(text.as_text(), "1/2");
        assert_eq!(text.as_f64(), 0.0);
    }

    #[test]
    fn null_and_missing_quantities_are_equivalent() {
        let with_null: GeneratedIngredient =
            serde_json::from_str(r#"{"name": "salt", "original_quantity": null}"#).unwrap();
        let without: GeneratedIngredient = serde_json::from_str(r#"{"name": "salt"}"#).unwrap();

        assert!(with_null.original_quantity.is_none());
        assert!(without.original_quantity.is_none());
    }

    #[test]
    fn full_payload_deserializes() {
        let payload = r#"{
            "recipe": {
                "recipe_name": "Shakshuka",
                "description": "Eggs poached in spiced tomato sauce.",
                "prep_time": 10,
                "cooking_time": 25,
                "total_time": null,
                "original_serving_size": 2,
                "difficulty_rating": 2,
                "focused_diet": "vegetarian",
                "estimated_calories": 420
            },
            "ingredients": [
                {"original_quantity": "4", "original_unit": "pcs", "quantity": 4, "unit": "pcs", "name": "eggs"},
                {"original_quantity": 400, "original_unit": "g", "quantity": 400, "unit": "g", "name": "crushed tomatoes"}
            ],
            "instructions": [
                {"step_number": 1, "instruction": "Soften the onion and garlic."},
                {"step_number": 2, "instruction": "Simmer tomatoes, crack in the eggs."}
            ],
            "nutrition": {"protein": 18.5, "carbs": 12.0, "fat": 14.0, "fiber": 4.0},
            "cuisine_categories": ["Middle Eastern"],
            "meal_types": ["Breakfast"],
            "occasions": [],
            "dietary_restrictions": ["Vegetarian"],
            "equipment": ["skillet"]
        }"#;

        let recipe: GeneratedRecipe = serde_json::from_str(payload).unwrap();
        assert_eq!(recipe.recipe.recipe_name, "Shakshuka");
        assert_eq!(recipe.recipe.total_time, None);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].original_quantity.as_ref().unwrap().as_text(), "4");
        assert!(!recipe.nutrition.is_all_zero());
    }

    #[test]
    fn missing_category_lists_default_to_empty() {
        let minimal = r#"{"recipe": {"recipe_name": "Toast"}, "ingredients": [], "instructions": []}"#;
        let recipe: GeneratedRecipe = serde_json::from_str(minimal).unwrap();
        assert!(recipe.cuisine_categories.is_empty());
        assert!(recipe.equipment.is_empty());
        assert!(recipe.nutrition.is_all_zero());
    }

    #[test]
    fn format_number_renders_whole_and_fractional_values() {
        assert_eq!(format_number(0.0), "");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(1.5), "1.50");
        assert_eq!(format_number(0.25), "0.25");
    }
}
