//! Client for the generative-language `generateContent` endpoint.

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use wxcast_core::{Config, NetworkError, PredictionError, ReqwestErrorExt};

use crate::retry::{is_retryable_error, with_retry, RetryConfig, RetryDecision};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// Web search grounding tool. Serializes as `{"google_search": {}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GoogleSearch {}

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl GenerateRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::text(text)],
            tools: None,
            system_instruction: None,
        }
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::text(text));
        self
    }

    /// Ask the model to ground its answer with web search results.
    pub fn with_search_grounding(mut self) -> Self {
        self.tools = Some(vec![Tool {
            google_search: GoogleSearch::default(),
        }]);
        self
    }

    /// Text of the first prompt part, for logging and display.
    pub fn prompt_text(&self) -> &str {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}

/// A web citation returned alongside grounded text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// Successful model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub sources: Vec<Source>,
    pub attempts: u32,
}

/// Pull the first candidate's text and any grounding sources out of a response.
pub fn parse_generation(body: &Value) -> Result<(String, Vec<Source>), PredictionError> {
    let candidate = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| PredictionError::MalformedResponse("response has no candidates".into()))?;

    let text = candidate
        .pointer("/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            let reason = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            PredictionError::MalformedResponse(format!(
                "first candidate has no text (finish reason: {reason})"
            ))
        })?;

    Ok((text.to_string(), extract_sources(candidate)))
}

/// Citations from `groundingAttributions` or `groundingChunks`.
///
/// Entries without both a URI and a title are dropped.
fn extract_sources(candidate: &Value) -> Vec<Source> {
    let Some(metadata) = candidate.get("groundingMetadata") else {
        return Vec::new();
    };

    ["groundingAttributions", "groundingChunks"]
        .iter()
        .filter_map(|key| metadata.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| {
            let web = entry.get("web")?;
            Some(Source {
                uri: web.get("uri")?.as_str()?.to_string(),
                title: web.get("title")?.as_str()?.to_string(),
            })
        })
        .collect()
}

/// Generative endpoint client with bounded retries.
#[derive(Clone)]
pub struct GenerativeClient {
    client: Arc<Client>,
    endpoint: String,
    api_key: String,
    retry: RetryConfig,
}

// The key stays out of debug output.
impl std::fmt::Debug for GenerativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeClient")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GenerativeClient {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self, PredictionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.model.timeout_secs))
            .build()
            .map_err(|e| PredictionError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            endpoint: format!(
                "{}/{}:generateContent",
                config.endpoints.generative_url.trim_end_matches('/'),
                config.model.name
            ),
            api_key: api_key.into(),
            retry: RetryConfig::from(&config.model),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Submit a request, retrying transient failures.
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint), level = "info")]
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Generation, PredictionError> {
        tracing::debug!("Prompt: {}", request.prompt_text());

        let outcome = with_retry(&self.retry, || async {
            self.client
                .post(&self.endpoint)
                .header(API_KEY_HEADER, &self.api_key)
                .header(header::CONTENT_TYPE, "application/json")
                .json(request)
                .send()
                .await
        })
        .await;
        let attempts = outcome.attempts;

        let response = match outcome.result {
            Ok(response) => response,
            Err(e) => {
                let e = e.without_url();
                return Err(match is_retryable_error(&e) {
                    RetryDecision::Retry => PredictionError::Unavailable {
                        attempts,
                        status: None,
                        last_response: Some(e.to_string()),
                    },
                    RetryDecision::NoRetry => PredictionError::Network(e.into_network_error()),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "Generative endpoint returned {} after {} attempt(s): {}",
                status,
                attempts,
                body
            );
            return Err(PredictionError::Unavailable {
                attempts,
                status: Some(status.as_u16()),
                last_response: Some(body),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            PredictionError::Network(NetworkError::InvalidResponse(e.without_url().to_string()))
        })?;
        let (text, sources) = parse_generation(&body)?;

        tracing::info!(
            "Generated {} char(s) with {} source(s) in {} attempt(s)",
            text.len(),
            sources.len(),
            attempts
        );

        Ok(Generation {
            text,
            sources,
            attempts,
        })
    }
}
