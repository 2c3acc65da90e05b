/*!
 * Tests for application configuration functionality
 */

use pdftwai::app_config::{Config, LogLevel, RenderMode, TranslationProvider};
use pdftwai::language_utils::Language;
use pdftwai::layout::{GroupingStrategy, Placement};
use pdftwai::pdf::fonts::DEFAULT_FONT_URL;
use pdftwai::pdf::{FontSource, PageSize};

use crate::common;

#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.target_language, "pa");
    assert_eq!(config.fallback_source_language, "en");
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert_eq!(config.translation.common.retry_count, 0);
    assert!((config.translation.common.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.pipeline.grouping, GroupingStrategy::Page);
    assert_eq!(config.pipeline.render.mode, RenderMode::Fresh);
    assert_eq!(config.pipeline.render.page_size, PageSize::LETTER);
    assert_eq!(
        config.pipeline.render.fonts.primary,
        FontSource::Url {
            url: DEFAULT_FONT_URL.to_string()
        }
    );
    assert_eq!(config.pipeline.layout.placement, Placement::Flow);
    assert_eq!(config.pipeline.max_input_bytes, 10 * 1024 * 1024);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_validate_withHostedProviderAndNoKey_shouldFail() {
    let config = Config::default();
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn test_validate_withKeyOrLocalProvider_shouldPass() {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    assert!(common::offline_config().validate().is_ok());
}

#[test]
fn test_validate_withUnsupportedTarget_shouldFail() {
    let mut config = common::offline_config();
    config.target_language = "fr".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withMarginsWiderThanPage_shouldFail() {
    let mut config = common::offline_config();
    config.pipeline.render.page_size = PageSize {
        width: 90.0,
        height: 792.0,
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "target_language": "en",
        "translation": { "provider": "anthropic" },
        "pipeline": {
            "grouping": { "strategy": "line" },
            "render": { "mode": "overlay" }
        }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.target().unwrap(), Language::English);
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.translation.get_model(), "claude-3-haiku-20240307");
    assert_eq!(config.pipeline.grouping, GroupingStrategy::Line { tolerance: 2.0 });
    assert_eq!(config.pipeline.render.mode, RenderMode::Overlay);
    assert!(config.translation.common.cache_enabled);
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.target_language, created.target_language);
    assert_eq!(reloaded.pipeline, created.pipeline);
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", b"{ not json").unwrap();
    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_activeProviderConfigMut_withMissingEntry_shouldInsertDefaults() {
    let mut config = Config::default();
    config.translation.available_providers.clear();
    config.translation.provider = TranslationProvider::Ollama;

    config.translation.active_provider_config_mut().model = "qwen2.5:7b".to_string();

    assert_eq!(config.translation.available_providers.len(), 1);
    assert_eq!(config.translation.get_model(), "qwen2.5:7b");
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.translation.get_rate_limit(), None);
}

#[test]
fn test_providerParsing_shouldRoundTripThroughDisplay() {
    for provider in [
        TranslationProvider::OpenAI,
        TranslationProvider::Anthropic,
        TranslationProvider::Ollama,
    ] {
        assert_eq!(provider.to_string().parse::<TranslationProvider>().unwrap(), provider);
    }
    assert!("lmstudio".parse::<TranslationProvider>().is_err());
    assert_eq!("OVERLAY".parse::<RenderMode>().unwrap(), RenderMode::Overlay);
}
