pub(crate) mod content;
pub(crate) mod recipe;

pub(crate) use content::validate_content;
pub(crate) use recipe::{validate_recipe, OutputValidationConfig};
