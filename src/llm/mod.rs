use crate::config::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Language-model vendor seam: JSON-mode chat completion and text
/// embedding. Trait-shaped so handlers and tests can swap in fakes.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a chat completion constrained to emit a single JSON object and
    /// return the parsed object.
    async fn chat_json(&self, system: &str, user: &str) -> Result<serde_json::Value>;

    /// Embed `text` into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// OpenAI-compatible HTTP client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key);
        let mut auth_header = header::HeaderValue::from_str(&auth_value)
            .map_err(|e| Error::Config(format!("Invalid LLM API key: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_header);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimensions: config.embedding_dimensions,
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("LLM request: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            error!("LLM API error: {} - {}", status, error_body);

            return Err(match status {
                StatusCode::UNAUTHORIZED => Error::Llm("authentication failed".to_string()),
                StatusCode::TOO_MANY_REQUESTS => Error::Llm("vendor rate limit".to_string()),
                _ => Error::Llm(format!("HTTP {status}")),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: 0.0,
        };

        let response: ChatResponse = self.post("/chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("completion returned no content".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Llm(format!("completion was not valid JSON: {e}")))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self.post("/embeddings", &request).await?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Llm("embedding response was empty".to_string()))?;

        if vector.len() != self.embedding_dimensions {
            return Err(Error::Llm(format!(
                "expected a {}-dimension embedding, got {}",
                self.embedding_dimensions,
                vector.len()
            )));
        }

        Ok(vector)
    }
}
