//! OpenAI-compatible chat completions provider.
//!
//! Speaks the `POST {base_url}/chat/completions` contract, so it also works
//! against local gateways that mimic the OpenAI API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use crate::error::LlmError;

const PROVIDER: &str = "openai";

/// OpenAI API provider.
pub struct OpenAiProvider {
    api_key: SecretString,
    model: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_api_request<'a>(&'a self, request: &'a CompletionRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                provider: PROVIDER.to_string(),
                timeout: self.timeout,
            }
        } else {
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_api_request(&request);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                },
                429 => LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                },
                _ => LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        parse_api_response(&text)
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn parse_api_response(text: &str) -> Result<CompletionResponse, LlmError> {
    let parsed: ApiResponse = serde_json::from_str(text)?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "response contained no choices".to_string(),
        })?;

    let usage = parsed.usage.unwrap_or(ApiUsage {
        prompt_tokens: 0,
        completion_tokens: 0,
    });

    Ok(CompletionResponse {
        // A null content (e.g. filtered output) is treated as an empty reply.
        content: choice.message.content.unwrap_or_default(),
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
        response_id: parsed.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(
            SecretString::from("sk-test"),
            "gpt-4o-mini",
            "https://api.openai.com/v1/",
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn url_strips_trailing_slash() {
        assert_eq!(
            provider().completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn request_serialization_omits_unset_options() {
        let provider = provider();
        let request = CompletionRequest::new(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ]);
        let json = serde_json::to_value(provider.to_api_request(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());

        let tuned = request.with_max_tokens(100).with_temperature(0.0);
        let json = serde_json::to_value(provider.to_api_request(&tuned)).unwrap();
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn parse_full_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let response = parse_api_response(raw).unwrap();
        assert_eq!(response.content, "Hello!");
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 3);
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.response_id.as_deref(), Some("chatcmpl-1"));
    }

    #[test]
    fn parse_null_content_as_empty() {
        let raw = r#"{"choices": [{"message": {"content": null}}]}"#;
        let response = parse_api_response(raw).unwrap();
        assert!(response.content.is_empty());
        assert_eq!(response.finish_reason, FinishReason::Unknown);
    }

    #[test]
    fn parse_without_choices_is_invalid() {
        let err = parse_api_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn parse_garbage_is_json_error() {
        let err = parse_api_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
    }
}
