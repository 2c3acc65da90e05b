use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{Provider, RateLimiter, RetryPolicy, classify_request_error, classify_status, http_client};

/// Port the Ollama server listens on unless told otherwise
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    retry: RetryPolicy,
    limiter: RateLimiter,
}

/// Generate request for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: None,
        }
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(num_predict);
        self
    }

    /// Ask for a single JSON object instead of a stream
    pub fn no_stream(mut self) -> Self {
        self.stream = Some(false);
        self
    }
}

impl Ollama {
    /// Create a client for `endpoint` with default timeout and no retries
    pub fn new(endpoint: &str) -> Self {
        Self::new_with_config(endpoint, 120, RetryPolicy::default(), None)
    }

    /// Create a client with explicit timeout, retry policy and rate limit
    pub fn new_with_config(endpoint: &str, timeout_secs: u64, retry: RetryPolicy, rate_limit: Option<u32>) -> Self {
        Self {
            base_url: normalize_base_url(endpoint),
            client: http_client(timeout_secs),
            retry,
            limiter: RateLimiter::new(rate_limit),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.limiter.acquire().await;

        let url = format!("{}/api/generate", self.base_url);
        debug!("Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_request_error("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(classify_status(status, error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Ollama response body: {}", e)))?;
        parse_generation(&body)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_request_error("Ollama", e))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Ollama version response: {}", e)))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = GenerationRequest;
    type Response = GenerationResponse;

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.retry.run("Ollama", || self.generate_once(&request)).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }

    fn extract_text(response: &GenerationResponse) -> String {
        response.response.clone()
    }
}

/// Add a scheme and the default port when the endpoint omits them
fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return format!("http://localhost:{}", DEFAULT_OLLAMA_PORT);
    }

    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    match Url::parse(&with_scheme) {
        Ok(mut url) => {
            if url.port().is_none() && url.scheme() == "http" {
                let _ = url.set_port(Some(DEFAULT_OLLAMA_PORT));
            }
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => format!("http://localhost:{}", DEFAULT_OLLAMA_PORT),
    }
}

/// Parse a generate response, tolerating a streamed (JSON lines) body
fn parse_generation(body: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(single) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(single);
    }

    let chunks: Vec<GenerationResponse> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    let Some(last) = chunks.last() else {
        return Err(ProviderError::ParseError(format!(
            "Ollama response is not valid JSON: {}",
            body.chars().take(200).collect::<String>()
        )));
    };

    Ok(GenerationResponse {
        model: last.model.clone(),
        response: chunks.iter().map(|c| c.response.as_str()).collect(),
        done: last.done,
        prompt_eval_count: last.prompt_eval_count,
        eval_count: last.eval_count,
    })
}
