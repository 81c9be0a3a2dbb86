pub(crate) mod generated_recipe;

pub(crate) use generated_recipe::{
    GeneratedIngredient, GeneratedInstruction, GeneratedNutrition, GeneratedRecipe, QuantityValue,
};
