use crate::error::SearchError;
use crate::traits::LanguageModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HOSTED_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat-completion client for any OpenAI-compatible endpoint: the hosted
/// API when a key is configured, or a local server (LM Studio, llama.cpp)
/// without one. A timed-out call surfaces as an ordinary failure and the
/// engine degrades the answer instead of erroring.
pub struct OpenAiChatModel {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client,
        })
    }

    pub fn hosted(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, SearchError> {
        Self::new(HOSTED_BASE_URL, Some(api_key.into()), model)
    }

    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, SearchError> {
        Self::new(base_url, None, model)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, SearchError> {
        let body = ChatRequest {
            model: &self.model,
            temperature,
            max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.trim());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chat-completions".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(SearchError::BackendResponse {
                backend: "chat-completions".to_string(),
                details: "response contained no answer text".to_string(),
            });
        }

        Ok(answer)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, ChatRequest, OpenAiChatModel};

    #[test]
    fn request_payload_matches_the_chat_schema() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            temperature: 0.3,
            max_tokens: 500,
            messages: vec![ChatMessage {
                role: "user",
                content: "Question: what does she do?",
            }],
        };

        let encoded = serde_json::to_value(&body).expect("serializes");
        assert_eq!(encoded["model"], "gpt-3.5-turbo");
        assert_eq!(encoded["max_tokens"], 500);
        assert_eq!(encoded["messages"][0]["role"], "user");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let model =
            OpenAiChatModel::local("http://localhost:1234/v1/", "local-model").expect("builds");
        assert_eq!(model.base_url, "http://localhost:1234/v1");
    }
}
