//! Shared client for the OpenAI-compatible chat-completions endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::prompts;
use crate::util::AppError;
use crate::validation::content::{ContentJudge, ContentValidationResult, JudgeAnswer};

/// The closed set of chat-completions backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProviderKind {
    Groq,
    Cerebras,
    OpenAi,
}

impl ProviderKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Cerebras => "cerebras",
            ProviderKind::OpenAi => "openai",
        }
    }

    fn base_url(self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Cerebras => "https://api.cerebras.ai/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }

    fn model(self) -> &'static str {
        match self {
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::Cerebras => "gpt-oss-120b",
            ProviderKind::OpenAi => "gpt-3.5-turbo-1106",
        }
    }

    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "cerebras" => ProviderKind::Cerebras,
            "openai" => ProviderKind::OpenAi,
            _ => ProviderKind::Groq,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ChatCompletionsClient {
    kind: ProviderKind,
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl ChatCompletionsClient {
    pub(crate) fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self::with_base_url(kind, api_key, kind.base_url())
    }

    pub(crate) fn with_base_url(
        kind: ProviderKind,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    pub(crate) fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// One chat completion round with a JSON-object response hint.
    pub(crate) async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, AppError> {
        let body = json!({
            "model": self.kind.model(),
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content},
            ],
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                AppError::generation(
                    format!("{} request failed: {error}", self.kind.name()),
                    502,
                )
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|error| {
            AppError::generation(
                format!("failed to read {} response: {error}", self.kind.name()),
                502,
            )
        })?;

        if status >= 400 {
            return Err(AppError::generation(
                format!("{} API error: {text}", self.kind.name()),
                status,
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|error| {
            AppError::Internal(format!(
                "failed to parse {} response: {error}",
                self.kind.name()
            ))
        })?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(AppError::generation(
                format!("no response from {}", self.kind.name()),
                502,
            ));
        };

        Ok(choice.message.content)
    }
}

/// LLM-backed yes/no gate for the content validator.
pub(crate) struct LlmContentGate {
    chat: ChatCompletionsClient,
}

impl LlmContentGate {
    pub(crate) fn new(chat: ChatCompletionsClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl ContentJudge for LlmContentGate {
    async fn judge(
        &self,
        caption: &str,
        transcript: &str,
    ) -> anyhow::Result<ContentValidationResult> {
        let prompt = prompts::build_content_gate_prompt(caption, transcript);
        let answer = self
            .chat
            .complete(prompts::CONTENT_GATE_SYSTEM_PROMPT, &prompt)
            .await?;

        let parsed: JudgeAnswer = serde_json::from_str(&answer)
            .map_err(|error| anyhow::anyhow!("failed to parse judge answer: {error}"))?;

        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn complete_extracts_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "llama-3.3-70b-versatile",
                "response_format": {"type": "json_object"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"ok\": true}"}}]
            })))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::with_base_url(ProviderKind::Groq, "key", server.uri());
        let content = client.complete("system", "user").await.expect("completes");
        assert_eq!(content, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::with_base_url(ProviderKind::OpenAi, "key", server.uri());
        let error = client.complete("system", "user").await.expect_err("fails");
        assert!(error.to_string().contains("no response"));
    }

    #[tokio::test]
    async fn http_error_keeps_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit"))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::with_base_url(ProviderKind::Cerebras, "key", server.uri());
        let error = client.complete("system", "user").await.expect_err("fails");
        assert_eq!(error.upstream_status(), Some(429));
    }

    #[tokio::test]
    async fn content_gate_parses_judge_answer() {
        let server = MockServer::start().await;
        let answer = json!({
            "has_recipe": true,
            "confidence": "high",
            "reason": "lists ingredients",
            "missing": []
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": answer.to_string()}}]
            })))
            .mount(&server)
            .await;

        let gate = LlmContentGate::new(ChatCompletionsClient::with_base_url(
            ProviderKind::Groq,
            "key",
            server.uri(),
        ));

        let verdict = gate.judge("caption", "transcript").await.expect("judges");
        assert!(verdict.is_valid);
    }
}
