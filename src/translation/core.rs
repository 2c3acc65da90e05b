/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService, which translates text through
 * the configured LLM provider and caches the results.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

use super::cache::TranslationCache;
use super::orchestrator::TextTranslator;
use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils::Language;
use crate::providers::Provider;
use crate::providers::RetryPolicy;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Number of provider requests
    pub requests: u64,
    /// Total time spent on API requests
    pub api_duration: Duration,
    pub provider: String,
    pub model: String,
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            api_duration: Duration::ZERO,
            provider,
            model,
        }
    }

    /// Record one request
    pub fn add_request(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>, duration: Duration) {
        self.requests += 1;
        self.api_duration += duration;
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }
        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// One-line summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} request(s), {} prompt + {} completion = {} tokens in {:.1}s",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.api_duration.as_secs_f64()
        )
    }
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    OpenAI { client: OpenAI },
    Anthropic { client: Anthropic },
    Ollama { client: Ollama },
}

/// Translation service backed by an LLM provider
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Translation cache for storing and retrieving translations
    pub cache: TranslationCache,

    usage: Mutex<TokenUsageStats>,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let retry = RetryPolicy::new(config.common.retry_count, config.common.retry_backoff_ms);
        let rate_limit = config.get_rate_limit();
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new_with_config(
                    config.get_api_key(),
                    config.get_endpoint(),
                    timeout_secs,
                    retry,
                    rate_limit,
                ),
            },
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new_with_config(
                    config.get_api_key(),
                    config.get_endpoint(),
                    timeout_secs,
                    retry,
                    rate_limit,
                ),
            },
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new_with_config(&config.get_endpoint(), timeout_secs, retry, rate_limit),
            },
        };

        let usage = TokenUsageStats::with_provider_info(config.provider.display_name().to_string(), config.get_model());

        Ok(Self {
            provider,
            cache: TranslationCache::new(config.common.cache_enabled),
            config,
            usage: Mutex::new(usage),
        })
    }

    /// System prompt with the language placeholders filled in
    pub fn system_prompt(&self, source: Language, target: Language) -> String {
        self.config
            .common
            .system_prompt
            .replace("{source_language}", source.name())
            .replace("{target_language}", target.name())
    }

    /// Snapshot of accumulated token usage
    pub fn usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        info!(
            "Testing connection to {} with model {}",
            self.config.provider.display_name(),
            self.config.get_model()
        );
        match &self.provider {
            TranslationProviderImpl::OpenAI { client } => client.test_connection().await,
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
        }
    }

    /// Translate a single text string
    pub async fn translate_text(&self, text: &str, source: Language, target: Language) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        if let Some(cached) = self.cache.get(text, source, target) {
            return Ok(cached);
        }

        let start = Instant::now();
        let (translated, prompt_tokens, completion_tokens) = self.request(text, source, target).await?;
        self.usage.lock().add_request(prompt_tokens, completion_tokens, start.elapsed());

        let translated = translated.trim().to_string();
        if !translated.is_empty() {
            self.cache.store(text, source, target, &translated);
        }
        debug!(
            "{} translated {} char(s) in {:?}",
            self.config.provider.display_name(),
            text.chars().count(),
            start.elapsed()
        );

        Ok(translated)
    }

    /// Send one request to the configured provider
    async fn request(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<(String, Option<u64>, Option<u64>), ProviderError> {
        let system_prompt = self.system_prompt(source, target);
        let model = self.config.get_model();
        let common = &self.config.common;

        match &self.provider {
            TranslationProviderImpl::OpenAI { client } => {
                let request = OpenAIRequest::new(model)
                    .add_message("system", system_prompt)
                    .add_message("user", text)
                    .temperature(common.temperature)
                    .max_tokens(common.max_tokens);
                let response = client.complete(request).await?;
                let usage = response.usage.as_ref();
                Ok((
                    OpenAI::extract_text(&response),
                    usage.map(|u| u.prompt_tokens as u64),
                    usage.map(|u| u.completion_tokens as u64),
                ))
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(model, common.max_tokens)
                    .system(system_prompt)
                    .add_message("user", text)
                    .temperature(common.temperature);
                let response = client.complete(request).await?;
                Ok((
                    Anthropic::extract_text(&response),
                    Some(response.usage.input_tokens as u64),
                    Some(response.usage.output_tokens as u64),
                ))
            }
            TranslationProviderImpl::Ollama { client } => {
                let request = GenerationRequest::new(model, text)
                    .system(system_prompt)
                    .temperature(common.temperature)
                    .num_predict(common.max_tokens)
                    .no_stream();
                let response = client.complete(request).await?;
                Ok((
                    Ollama::extract_text(&response),
                    response.prompt_eval_count,
                    response.eval_count,
                ))
            }
        }
    }
}

#[async_trait]
impl TextTranslator for TranslationService {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String, ProviderError> {
        self.translate_text(text, source, target).await
    }
}
