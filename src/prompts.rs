//! Prompt templates for the generation and validation calls.
//!
//! The wording here is operator-tuned configuration; code must treat the
//! rendered strings as opaque.

const ROLE_SECTION: &str = "<ROLE>\nYou are a specialized assistant that parses cooking recipes out of social media posts. Extract the recipe details from the given caption and video transcript and answer with structured JSON only.\n</ROLE>";

const OUTPUT_FORMAT_SECTION: &str = r#"<OUTPUT_FORMAT>
Respond with a single JSON object, no surrounding text:

{
  "recipe": {
    "recipe_name": "",
    "description": "",
    "prep_time": null,
    "cooking_time": null,
    "total_time": null,
    "original_serving_size": null,
    "difficulty_rating": null,
    "focused_diet": "",
    "estimated_calories": null
  },
  "ingredients": [
    {"original_quantity": null, "original_unit": "", "quantity": null, "unit": "", "name": ""}
  ],
  "instructions": [
    {"step_number": null, "instruction": ""}
  ],
  "nutrition": {"protein": null, "carbs": null, "fat": null, "fiber": null},
  "cuisine_categories": [],
  "meal_types": [],
  "occasions": [],
  "dietary_restrictions": [],
  "equipment": []
}
</OUTPUT_FORMAT>"#;

const RULES_SECTION: &str = "<RULES>\n\
1. Adjusted ingredient quantities MUST use metric units (g, mg, kg, ml, L, \u{b0}C) or counts (piece, whole, slice, clove, pinch); never cups, tbsp, tsp, oz or lb.\n\
2. Keep original_quantity and original_unit exactly as stated in the source.\n\
3. Adjust quantity and unit to exactly one serving; divide by original_serving_size when given, estimate it otherwise.\n\
4. Times are in minutes; difficulty_rating is 1-5; nutrition values are grams per serving.\n\
5. Preserve the language of the source post for names, descriptions and instructions.\n\
6. Infer missing fields from context; use null where no sensible inference exists.\n\
</RULES>";

fn platform_context(platform: &str) -> &'static str {
    match platform {
        "instagram" => "<PLATFORM_CONTEXT>\nThis post comes from Instagram: captions are usually detailed, often with emoji bullet lists and informal measurements.\n</PLATFORM_CONTEXT>",
        "tiktok" => "<PLATFORM_CONTEXT>\nThis post comes from TikTok: captions are sparse and the spoken transcript carries most of the recipe; measurements are often visual estimates.\n</PLATFORM_CONTEXT>",
        _ => "",
    }
}

/// System prompt for the recipe extraction call.
pub(crate) fn build_recipe_prompt(platform: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(ROLE_SECTION);
    prompt.push_str("\n\n");

    let context = platform_context(platform);
    if !context.is_empty() {
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    prompt.push_str(OUTPUT_FORMAT_SECTION);
    prompt.push_str("\n\n");
    prompt.push_str(RULES_SECTION);
    prompt
}

/// System prompt for the yes/no content gate.
pub(crate) const CONTENT_GATE_SYSTEM_PROMPT: &str =
    "You are a recipe content validator. Analyze content and respond with JSON only.";

/// User prompt for the yes/no content gate.
pub(crate) fn build_content_gate_prompt(caption: &str, transcript: &str) -> String {
    let mut content = String::new();
    if !caption.is_empty() {
        content.push_str("Caption: ");
        content.push_str(caption);
        content.push_str("\n\n");
    }
    if !transcript.is_empty() {
        content.push_str("Transcript: ");
        content.push_str(transcript);
    }

    format!(
        "Analyze if this social media content contains enough information to extract a recipe.\n\n\
A valid recipe must have at least ONE of the following:\n\
- Clear ingredients mentioned (e.g., \"2 cups flour\", \"1 egg\", \"garlic\")\n\
- Cooking instructions or steps (e.g., \"mix together\", \"bake for 20 minutes\")\n\
- Food preparation steps (e.g., \"chop the onions\", \"heat the pan\")\n\n\
Content to analyze:\n{content}\n\n\
Respond with ONLY a JSON object (no additional text):\n\
{{\n  \"has_recipe\": true or false,\n  \"confidence\": \"high\", \"medium\", or \"low\",\n  \"reason\": \"brief explanation\",\n  \"missing\": [\"list\", \"of\", \"missing\", \"elements\"]\n}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_prompt_injects_platform_context() {
        let instagram = build_recipe_prompt("instagram");
        assert!(instagram.contains("Instagram"));
        assert!(instagram.contains("OUTPUT_FORMAT"));

        let tiktok = build_recipe_prompt("tiktok");
        assert!(tiktok.contains("TikTok"));

        let unknown = build_recipe_prompt("myspace");
        assert!(!unknown.contains("PLATFORM_CONTEXT"));
    }

    #[test]
    fn content_gate_prompt_includes_both_sources() {
        let prompt = build_content_gate_prompt("caption text", "transcript text");
        assert!(prompt.contains("Caption: caption text"));
        assert!(prompt.contains("Transcript: transcript text"));
        assert!(prompt.contains("has_recipe"));
    }
}
