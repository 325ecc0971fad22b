//! Google Gemini implementation of [`TextGenerator`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::error::GenerationError;
use super::generator::{GenerationParams, TextGenerator};

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    model_id: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeminiClient {
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
    pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

    /// Client for the default model and endpoint. No request timeout is set.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            model_id: Self::DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Point the client at another host (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, GenerationError> {
        self.http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerationError::Transport)?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_id)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            temperature = params.temperature,
            max_output_tokens = params.max_output_tokens,
            "requesting Gemini completion"
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
            },
        };

        // The key travels as a query parameter; strip URLs from transport
        // errors so it never reaches logs.
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url()))?;

        if !status.is_success() {
            let payload = serde_json::from_str::<serde_json::Value>(&text)
                .unwrap_or(serde_json::Value::String(text));
            error!(status = %status, payload = %payload, "Gemini API returned error status");
            return Err(GenerationError::Remote {
                status: status.as_u16(),
                payload,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "failed to parse Gemini response");
            GenerationError::UnexpectedResponse(e.to_string())
        })?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .concat()
            })
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        debug!(reply_len = reply.len(), "Gemini completion received");
        Ok(reply)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}
