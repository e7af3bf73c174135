use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::{Conversation, Model, ModelError};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Deserialize)]
struct OpenAIGPTMessage {
    #[allow(unused)] // needed for deserialization
    pub role: OpenAIGPTRole,
    // GPT-5 models can answer with a null content
    pub content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIGPTMessageEntry {
    #[allow(unused)] // needed for deserialization
    pub index: u64,
    pub message: OpenAIGPTMessage,
}

#[derive(Deserialize)]
struct OpenAIGPTResponse {
    #[allow(unused)] // needed for deserialization
    pub id: String,
    #[allow(unused)] // needed for deserialization
    pub model: String,
    pub choices: Vec<OpenAIGPTMessageEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpenAIGPTRole {
    System,
    Assistant,
    User,
}

#[derive(Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIGPTModel {
    #[serde(rename = "gpt-5-nano")]
    GPT5Nano,
    #[serde(rename = "gpt-5-mini")]
    GPT5Mini,
    #[serde(rename = "gpt-5")]
    GPT5,
    #[serde(rename = "gpt-4o-mini")]
    GPT4oMini,
}

impl OpenAIGPTModel {
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::GPT5Nano => "gpt-5-nano",
            Self::GPT5Mini => "gpt-5-mini",
            Self::GPT5 => "gpt-5",
            Self::GPT4oMini => "gpt-4o-mini",
        }
    }
}

#[derive(Debug, Error)]
pub enum OpenAIError {
    #[error("❌ OPENAI_API_KEY not found. Set it in the environment or in a .env file.")]
    MissingApiKey,
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rate limit reached: {0}")]
    RateLimited(String),
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response contained no choices")]
    NoChoices,
}

/// Read the API key, preferring a local `.env` over nothing at all.
pub fn api_key_from_env() -> Result<String, OpenAIError> {
    // a missing .env file is fine, the variable may come from the shell
    let _ = dotenvy::dotenv();
    std::env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(OpenAIError::MissingApiKey)
}

pub struct OpenAIClient {
    client: Client,
    model: OpenAIGPTModel,
    api_base: String,
    max_completion_tokens: u32,
}

impl OpenAIClient {
    pub fn new(
        model: OpenAIGPTModel,
        api_key: &str,
        api_base: &str,
        max_completion_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, OpenAIError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|err| OpenAIError::InvalidApiKey(err.to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = ClientBuilder::new()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
            max_completion_tokens,
        })
    }

    fn request_body(&self, conversation: &Conversation) -> serde_json::Value {
        json!({
            "model": self.model.api_name(),
            "messages": [
                {"role": "system", "content": conversation.system},
                {"role": "user", "content": conversation.user}
            ],
            "max_completion_tokens": self.max_completion_tokens
        })
    }

    pub async fn complete(&self, conversation: &Conversation) -> Result<Option<String>, OpenAIError> {
        let url = format!("{}/chat/completions", self.api_base);
        tracing::debug!(
            model = self.model.api_name(),
            user_len = conversation.user.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(url)
            .json(&self.request_body(conversation))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_response(status, &body)
    }
}

#[async_trait]
impl Model for OpenAIClient {
    async fn send(&self, conversation: &Conversation) -> Result<Option<String>, ModelError> {
        Ok(self.complete(conversation).await?)
    }
}

fn parse_response(status: StatusCode, body: &str) -> Result<Option<String>, OpenAIError> {
    if !status.is_success() {
        let message = serde_json::from_str::<OpenAIErrorBody>(body)
            .map(|err| err.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
            OpenAIError::RateLimited(message)
        } else {
            OpenAIError::Status { status, message }
        });
    }

    let response: OpenAIGPTResponse = serde_json::from_str(body)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(OpenAIError::NoChoices)?;
    Ok(choice.message.content.filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{parse_response, OpenAIClient, OpenAIError, OpenAIGPTModel};
    use crate::Conversation;

    const OK_BODY: &str = r###"{
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-5-nano",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "## Neon Drift\n- Genre: racing"}, "finish_reason": "stop"}
        ]
    }"###;

    #[test]
    fn parses_content() {
        let text = parse_response(StatusCode::OK, OK_BODY).unwrap();
        assert_eq!(text.as_deref(), Some("## Neon Drift\n- Genre: racing"));
    }

    #[test]
    fn null_content_is_no_output() {
        let body = r#"{"id": "x", "model": "gpt-5-nano", "choices": [
            {"index": 0, "message": {"role": "assistant", "content": null}}
        ]}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), None);
    }

    #[test]
    fn empty_choices() {
        let body = r#"{"id": "x", "model": "gpt-5-nano", "choices": []}"#;
        assert!(matches!(
            parse_response(StatusCode::OK, body),
            Err(OpenAIError::NoChoices)
        ));
    }

    #[test]
    fn rate_limit_is_special_cased() {
        let body = r#"{"error": {"message": "Rate limit reached for gpt-5-nano", "type": "requests"}}"#;
        match parse_response(StatusCode::TOO_MANY_REQUESTS, body) {
            Err(OpenAIError::RateLimited(message)) => {
                assert_eq!(message, "Rate limit reached for gpt-5-nano");
            }
            _ => panic!("expected a rate limit error"),
        }
    }

    #[test]
    fn status_error_keeps_provider_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = parse_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP 401 Unauthorized: Incorrect API key provided"
        );
    }

    #[test]
    fn status_error_with_plain_body() {
        let err = parse_response(StatusCode::BAD_GATEWAY, "upstream down\n").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: upstream down");
    }

    #[test]
    fn malformed_body() {
        assert!(matches!(
            parse_response(StatusCode::OK, "not json"),
            Err(OpenAIError::Malformed(_))
        ));
    }

    #[test]
    fn request_body_shape() {
        let client = OpenAIClient::new(
            OpenAIGPTModel::GPT5Nano,
            "sk-test",
            "https://api.openai.com/v1/",
            1200,
            Duration::from_secs(5),
        )
        .unwrap();
        let body = client.request_body(&Conversation {
            system: "sys".to_string(),
            user: "usr".to_string(),
        });
        assert_eq!(body["model"], "gpt-5-nano");
        assert_eq!(body["max_completion_tokens"], 1200);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(client.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn model_names_round_trip_through_config() {
        let model: OpenAIGPTModel = serde_yaml::from_str("gpt-5-mini").unwrap();
        assert_eq!(model, OpenAIGPTModel::GPT5Mini);
        assert_eq!(model.api_name(), "gpt-5-mini");
    }

    #[cfg(feature = "live-api-tests")]
    #[tokio::test]
    async fn live_game_concept() {
        use crate::options::{Capability, Language};
        use crate::prompts::{build_prompt, SYSTEM_INSTRUCTION};

        let key = super::api_key_from_env().unwrap();
        let client = OpenAIClient::new(
            OpenAIGPTModel::GPT5Nano,
            &key,
            super::DEFAULT_API_BASE,
            1200,
            Duration::from_secs(60),
        )
        .unwrap();
        let conversation = Conversation {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: build_prompt(
                Capability::GameConceptGenerator,
                Language::English,
                "A cozy farming game on a space station",
            ),
        };
        client.complete(&conversation).await.unwrap();
    }
}
