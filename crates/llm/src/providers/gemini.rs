//! Google Gemini provider implementation.
//!
//! Talks to the Generative Language REST API:
//! `POST {endpoint}/models/{model}:generateContent?key=API_KEY`.
//! The generated text is read from `candidates[0].content.parts[0].text`.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use medrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

/// Gemini LLM client.
pub struct GeminiClient {
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1`
    base_url: String,

    /// API key sent as the `key` query parameter
    api_key: String,

    /// HTTP client with the request timeout applied
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for Gemini: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Convert LlmRequest to the Gemini body.
    fn to_gemini_request(&self, request: &LlmRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: GenerationParams {
                temperature: request.temperature,
                top_p: request.top_p,
                max_output_tokens: request.max_tokens,
            },
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: Some(system.clone()),
                }],
            }),
        }
    }

    /// Extract the answer text and usage from a response body.
    fn convert_response(&self, model: &str, body: GenerateContentResponse) -> AppResult<LlmResponse> {
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                AppError::Llm(
                    "Gemini response is missing candidates[0].content.parts[0].text".to_string(),
                )
            })?;

        let usage = body
            .usage_metadata
            .map(|u| {
                LlmUsage::new(
                    u.prompt_token_count.unwrap_or(0),
                    u.candidates_token_count.unwrap_or(0),
                )
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: text,
            model: body.model_version.unwrap_or_else(|| model.to_string()),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Gemini");

        let body = self.to_gemini_request(request);
        let url = self.endpoint_for(&request.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                AppError::Llm(format!("Request to Gemini {}: {}", kind, e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let preview: String = error_text.chars().take(200).collect();
            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, preview
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let response = self.convert_response(&request.model, body)?;

        tracing::info!(
            completion_tokens = response.usage.completion_tokens,
            "Received completion from Gemini"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "https://generativelanguage.googleapis.com/v1/",
            "test-key",
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_format() {
        let client = client();
        assert_eq!(
            client.endpoint_for("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let client = client();
        let request = LlmRequest::new("Question", "gemini-1.5-flash")
            .with_temperature(0.2)
            .with_top_p(0.95)
            .with_max_tokens(300);

        let body = serde_json::to_value(client.to_gemini_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Question");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 300);
        assert!((body["generationConfig"]["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_convert_response() {
        let client = client();
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Drink water."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 3}
        }))
        .unwrap();

        let response = client.convert_response("gemini-1.5-flash", body).unwrap();
        assert_eq!(response.content, "Drink water.");
        assert_eq!(response.model, "gemini-1.5-flash");
        assert_eq!(response.usage.total_tokens, 23);
    }

    #[test]
    fn test_convert_response_missing_text() {
        let client = client();
        let body: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();

        let result = client.convert_response("gemini-1.5-flash", body);
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let client =
            GeminiClient::new("http://127.0.0.1:9", "test-key", Duration::from_secs(2)).unwrap();
        let request = LlmRequest::new("Question", "gemini-1.5-flash");

        let result = client.complete(&request).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
