use crate::config::GeminiConfig;
use crate::error::{GenerationError, IndexError};
use crate::models::GenerationOptions;
use crate::traits::{Embedder, LanguageModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

const BACKEND: &str = "gemini";
/// Upper bound on `requests` per `batchEmbedContents` call.
const MAX_EMBED_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url, url::ParseError> {
        self.config
            .base_url
            .join(&format!("models/{model}:{method}"))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn build_generate_request<'a>(prompt: &'a str, options: &GenerationOptions) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
        },
    }
}

fn build_embed_request<'a>(model: &str, texts: &'a [String]) -> BatchEmbedRequest<'a> {
    BatchEmbedRequest {
        requests: texts
            .iter()
            .map(|text| EmbedRequest {
                model: format!("models/{model}"),
                content: Content {
                    role: None,
                    parts: vec![Part { text }],
                },
            })
            .collect(),
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String, GenerationError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

fn error_details(status: reqwest::StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    format!("{status}: {message}")
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let url = self
            .endpoint(&self.config.model, "generateContent")
            .map_err(|error| GenerationError::BackendResponse {
                backend: BACKEND.to_string(),
                details: error.to_string(),
            })?;
        debug!(model = %self.config.model, prompt_len = prompt.len(), "generateContent");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_generate_request(prompt, options))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(model = %self.config.model, %status, "generation request failed");
            return Err(GenerationError::BackendResponse {
                backend: BACKEND.to_string(),
                details: error_details(status, &body),
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        response_text(parsed)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    fn name(&self) -> &str {
        BACKEND
    }

    fn dimensions(&self) -> usize {
        self.config.embed_dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let embedding_error = |details: String| IndexError::Embedding {
            backend: BACKEND.to_string(),
            details,
        };

        let url = self
            .endpoint(&self.config.embed_model, "batchEmbedContents")
            .map_err(|error| embedding_error(error.to_string()))?;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBED_BATCH) {
            debug!(model = %self.config.embed_model, batch_size = batch.len(), "batchEmbedContents");

            let response = self
                .client
                .post(url.clone())
                .header("x-goog-api-key", &self.config.api_key)
                .json(&build_embed_request(&self.config.embed_model, batch))
                .send()
                .await
                .map_err(|error| embedding_error(error.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|error| embedding_error(error.to_string()))?;
            if !status.is_success() {
                error!(model = %self.config.embed_model, %status, "embedding request failed");
                return Err(embedding_error(error_details(status, &body)));
            }

            let parsed: BatchEmbedResponse =
                serde_json::from_str(&body).map_err(|error| embedding_error(error.to_string()))?;
            if parsed.embeddings.len() != batch.len() {
                return Err(embedding_error(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    parsed.embeddings.len()
                )));
            }
            vectors.extend(parsed.embeddings.into_iter().map(|embedding| embedding.values));
        }

        Ok(vectors)
    }
}
