/*!
 * Tests for provider clients against a local stub server
 */

use pdftwai::app_config::{ProviderConfig, TranslationConfig, TranslationProvider};
use pdftwai::errors::ProviderError;
use pdftwai::language_utils::Language;
use pdftwai::providers::anthropic::{Anthropic, AnthropicRequest};
use pdftwai::providers::ollama::{GenerationRequest, Ollama};
use pdftwai::providers::openai::{OpenAI, OpenAIRequest};
use pdftwai::providers::{Provider, RetryPolicy};
use pdftwai::translation::TranslationService;

use crate::common::stub_server::{StubResponse, StubServer};

const OPENAI_REPLY: &str = r#"{
    "choices": [{ "message": { "role": "assistant", "content": "ਸਤ ਸ੍ਰੀ ਅਕਾਲ" } }],
    "usage": { "prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19 }
}"#;

#[tokio::test]
async fn test_openAI_complete_shouldSendBearerAuthAndParseChoice() {
    let server = StubServer::start(vec![StubResponse::ok(OPENAI_REPLY)]).await;
    let client = OpenAI::new("sk-test", server.base_url.clone());

    let response = client
        .complete(OpenAIRequest::new("gpt-4o-mini").add_message("user", "Hello"))
        .await
        .unwrap();

    assert_eq!(OpenAI::extract_text(&response), "ਸਤ ਸ੍ਰੀ ਅਕਾਲ");
    assert_eq!(response.usage.unwrap().total_tokens, 19);

    let request = server.last_request();
    assert!(request.starts_with("POST /chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
}

#[tokio::test]
async fn test_openAI_complete_withErrorStatuses_shouldClassify() {
    let server = StubServer::start(vec![
        StubResponse::status(401, r#"{"error":"bad key"}"#),
        StubResponse::status(429, r#"{"error":"slow down"}"#),
        StubResponse::status(400, r#"{"error":"bad request"}"#),
    ])
    .await;
    let client = OpenAI::new("sk-test", server.base_url.clone());
    let request = || OpenAIRequest::new("gpt-4o-mini").add_message("user", "Hello");

    assert!(matches!(
        client.complete(request()).await,
        Err(ProviderError::AuthenticationError(_))
    ));
    assert!(matches!(
        client.complete(request()).await,
        Err(ProviderError::RateLimitExceeded(_))
    ));
    assert!(matches!(
        client.complete(request()).await,
        Err(ProviderError::ApiError { status_code: 400, .. })
    ));
}

#[tokio::test]
async fn test_openAI_complete_withRetryPolicy_shouldRetryServerErrors() {
    let server = StubServer::start(vec![
        StubResponse::status(503, r#"{"error":"overloaded"}"#),
        StubResponse::ok(OPENAI_REPLY),
    ])
    .await;
    let client = OpenAI::new_with_config("sk-test", server.base_url.clone(), 5, RetryPolicy::new(2, 1), None);

    let response = client
        .complete(OpenAIRequest::new("gpt-4o-mini").add_message("user", "Hello"))
        .await
        .unwrap();

    assert_eq!(OpenAI::extract_text(&response), "ਸਤ ਸ੍ਰੀ ਅਕਾਲ");
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_openAI_complete_withoutRetries_shouldSurfaceFirstFailure() {
    let server = StubServer::start(vec![StubResponse::status(503, "{}"), StubResponse::ok(OPENAI_REPLY)]).await;
    let client = OpenAI::new("sk-test", server.base_url.clone());

    let result = client
        .complete(OpenAIRequest::new("gpt-4o-mini").add_message("user", "Hello"))
        .await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 503, .. })));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_anthropic_complete_shouldSendVersionHeaderAndJoinText() {
    let reply = r#"{
        "content": [{ "type": "text", "text": "Hello" }, { "type": "text", "text": " world" }],
        "usage": { "input_tokens": 5, "output_tokens": 2 }
    }"#;
    let server = StubServer::start(vec![StubResponse::ok(reply)]).await;
    let client = Anthropic::new("ak-test", server.base_url.clone());

    let response = client
        .complete(AnthropicRequest::new("claude-3-haiku-20240307", 100).add_message("user", "ਸਤ ਸ੍ਰੀ ਅਕਾਲ"))
        .await
        .unwrap();

    assert_eq!(Anthropic::extract_text(&response), "Hello world");
    let request = server.last_request().to_lowercase();
    assert!(request.starts_with("post /v1/messages"));
    assert!(request.contains("x-api-key: ak-test"));
    assert!(request.contains("anthropic-version: 2023-06-01"));
}

#[tokio::test]
async fn test_ollama_complete_shouldParseGeneration() {
    let reply = r#"{"model":"llama3.2:3b","response":" ਧੰਨਵਾਦ ","done":true,"prompt_eval_count":9,"eval_count":3}"#;
    let server = StubServer::start(vec![StubResponse::ok(reply)]).await;
    let client = Ollama::new(&server.base_url);

    let response = client
        .complete(GenerationRequest::new("llama3.2:3b", "Thank you").no_stream())
        .await
        .unwrap();

    assert_eq!(Ollama::extract_text(&response), " ਧੰਨਵਾਦ ");
    assert_eq!(response.eval_count, Some(3));
    assert!(server.last_request().starts_with("POST /api/generate"));
}

#[tokio::test]
async fn test_translationService_withOllama_shouldTrimCacheAndCountUsage() {
    let reply = r#"{"response":"  ਧੰਨਵਾਦ\n","done":true,"prompt_eval_count":9,"eval_count":3}"#;
    let server = StubServer::start(vec![StubResponse::ok(reply)]).await;

    let mut provider_config = ProviderConfig::new(TranslationProvider::Ollama);
    provider_config.endpoint = server.base_url.clone();
    let config = TranslationConfig {
        provider: TranslationProvider::Ollama,
        available_providers: vec![provider_config],
        ..TranslationConfig::default()
    };
    let service = TranslationService::new(config).unwrap();

    for _ in 0..2 {
        let translated = service
            .translate_text("Thank you", Language::English, Language::Punjabi)
            .await
            .unwrap();
        assert_eq!(translated, "ਧੰਨਵਾਦ");
    }

    assert_eq!(server.hits(), 1);
    let usage = service.usage();
    assert_eq!(usage.requests, 1);
    assert_eq!(usage.total_tokens, 12);

    let request = server.last_request();
    assert!(request.contains("from English to Punjabi"));
}

#[tokio::test]
async fn test_openAI_complete_withUnreachableEndpoint_shouldFailWithConnectionError() {
    // Port 9 (discard) is closed on test machines
    let client = OpenAI::new_with_config("sk-test", "http://127.0.0.1:9", 2, RetryPolicy::default(), None);
    let result = client
        .complete(OpenAIRequest::new("gpt-4o-mini").add_message("user", "Hello"))
        .await;
    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
}
