use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::config::EmbeddingConfig;

// --- Provider trait ---

pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAI,
}

pub fn resolve_provider(name: &str) -> Result<ProviderKind> {
    match name.trim().to_lowercase().as_str() {
        "ollama" | "local" => Ok(ProviderKind::Ollama),
        "openai" => Ok(ProviderKind::OpenAI),
        _ => Err(anyhow!(
            "Unknown embedding provider '{}'. Available: ollama (default), openai",
            name
        )),
    }
}

pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match resolve_provider(&config.provider)? {
        ProviderKind::Ollama => {
            let base_url = config.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL);
            let provider = OllamaProvider::new(config.model.clone(), base_url, timeout)?;
            Ok(Box::new(provider))
        }
        ProviderKind::OpenAI => {
            let base_url = config.base_url.as_deref().unwrap_or(OPENAI_DEFAULT_URL);
            let provider = OpenAIProvider::new(config.model.clone(), base_url, timeout)?;
            Ok(Box::new(provider))
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

// --- Ollama provider ---

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    embedding: Vec<f32>,
}

#[derive(Debug)]
pub struct OllamaProvider {
    endpoint: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OllamaProvider {
    pub fn new(model_id: String, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model_id,
            client: http_client(timeout)?,
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaRequest {
            model: &self.model_id,
            prompt: text,
        };

        debug!("POST {} ({} chars)", self.endpoint, text.len());
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .with_context(|| format!("Failed to reach Ollama at {}", self.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Ollama embedding request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OllamaResponse = response
            .json()
            .context("Failed to parse Ollama embedding response")?;

        non_empty(api_response.embedding, "Ollama")
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    endpoint: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set. Set it with: export OPENAI_API_KEY=your-key-here")?;
        Self::with_api_key(api_key, model_id, base_url, timeout)
    }

    pub fn with_api_key(api_key: String, model_id: String, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            model_id,
            client: http_client(timeout)?,
        })
    }
}

impl EmbeddingProvider for OpenAIProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OpenAIRequest {
            model: &self.model_id,
            input: text,
        };

        debug!("POST {} ({} chars)", self.endpoint, text.len());
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "OpenAI embedding request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OpenAIResponse = response
            .json()
            .context("Failed to parse OpenAI embedding response")?;

        let embedding = api_response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| anyhow!("No data in OpenAI embedding response"))?;
        non_empty(embedding, "OpenAI")
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

fn non_empty(embedding: Vec<f32>, service: &str) -> Result<Vec<f32>> {
    if embedding.is_empty() {
        return Err(anyhow!("Empty embedding returned by {}", service));
    }
    Ok(embedding)
}

// --- Similarity ---

/// Cosine of the angle between two vectors. Mismatched lengths and zero
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
