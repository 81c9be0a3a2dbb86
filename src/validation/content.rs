//! Pre-generation gate: does the scraped content look like a recipe at all?

use async_trait::async_trait;
use serde::Deserialize;

use crate::store::models::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub(crate) struct ContentValidationResult {
    pub(crate) is_valid: bool,
    pub(crate) confidence: Confidence,
    pub(crate) reason: String,
    pub(crate) missing: Vec<String>,
}

/// Fixed domain dictionary: cooking verbs, measurement units, staples.
const RECIPE_KEYWORDS: &[&str] = &[
    // cooking verbs
    "bake", "cook", "fry", "boil", "grill", "roast", "saute", "simmer", "steam", "mix", "whisk",
    "stir", "blend", "chop", "dice", "slice", "preheat", "prepare",
    // measurement indicators
    "ingredient", "cup", "tablespoon", "teaspoon", "tbsp", "tsp", "ounce", "oz", "gram", "ml",
    "liter",
    // recipe terms
    "recipe", "dish", "meal", "serve", "serving", "minutes", "hours", "temperature", "degrees",
    // common staples
    "flour", "sugar", "salt", "pepper", "oil", "butter", "egg", "milk", "water", "garlic", "onion",
];

const MIN_CAPTION_LEN: usize = 30;
const MIN_TRANSCRIPT_LEN: usize = 50;

/// Fast heuristic check, no remote calls.
///
/// Length thresholds are inclusive: a 30-char caption or a 50-char
/// transcript is enough. Sufficient length without any recipe keyword
/// downgrades confidence to medium but stays valid.
pub(crate) fn quick_validate(caption: &str, transcript: &str) -> ContentValidationResult {
    let combined = format!("{} {}", caption.trim(), transcript.trim());

    let has_minimum_length =
        caption.len() >= MIN_CAPTION_LEN || transcript.len() >= MIN_TRANSCRIPT_LEN;

    if !has_minimum_length {
        let reason = if combined.trim().is_empty() {
            "No content provided".to_string()
        } else {
            format!(
                "Content too short ({} chars). Need at least {MIN_CAPTION_LEN} chars in caption or {MIN_TRANSCRIPT_LEN} chars in transcript.",
                combined.trim().len()
            )
        };
        return ContentValidationResult {
            is_valid: false,
            confidence: Confidence::High,
            reason,
            missing: vec!["sufficient content length".to_string()],
        };
    }

    let lower = combined.to_lowercase();
    let found_keyword = RECIPE_KEYWORDS.iter().any(|kw| lower.contains(kw));

    if !found_keyword {
        return ContentValidationResult {
            is_valid: true,
            confidence: Confidence::Medium,
            reason: "Content has sufficient length but no common recipe keywords found".to_string(),
            missing: vec!["recipe keywords".to_string()],
        };
    }

    ContentValidationResult {
        is_valid: true,
        confidence: Confidence::High,
        reason: "Content passed quick validation".to_string(),
        missing: Vec::new(),
    }
}

/// LLM judgement used when the heuristic is ambiguous.
#[async_trait]
pub(crate) trait ContentJudge: Send + Sync {
    async fn judge(&self, caption: &str, transcript: &str)
        -> anyhow::Result<ContentValidationResult>;
}

/// Answer shape the gate expects back from the model.
#[derive(Debug, Deserialize)]
pub(crate) struct JudgeAnswer {
    pub(crate) has_recipe: bool,
    pub(crate) confidence: Confidence,
    #[serde(default)]
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) missing: Vec<String>,
}

impl From<JudgeAnswer> for ContentValidationResult {
    fn from(answer: JudgeAnswer) -> Self {
        Self {
            is_valid: answer.has_recipe,
            confidence: answer.confidence,
            reason: answer.reason,
            missing: answer.missing,
        }
    }
}

/// Combine the heuristic with the optional LLM gate.
///
/// The LLM answer overrides the heuristic only when its confidence is high,
/// or when the heuristic failed but the LLM passed.
pub(crate) async fn validate_content(
    caption: &str,
    transcript: &str,
    platform: Platform,
    judge: Option<&dyn ContentJudge>,
) -> ContentValidationResult {
    let quick = quick_validate(caption, transcript);

    if !quick.is_valid && quick.confidence == Confidence::High {
        return quick;
    }

    let Some(judge) = judge else {
        return quick;
    };

    let sparse_tiktok = platform == Platform::TikTok && caption.len() < 100;
    let should_run = !quick.is_valid || quick.confidence == Confidence::Medium || sparse_tiktok;
    if !should_run {
        return quick;
    }

    match judge.judge(caption, transcript).await {
        Ok(verdict) => {
            if verdict.confidence == Confidence::High || (!quick.is_valid && verdict.is_valid) {
                verdict
            } else if quick.is_valid {
                quick
            } else {
                verdict
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "content judge unavailable, keeping heuristic verdict");
            quick
        }
    }
}
