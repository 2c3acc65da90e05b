/*!
 * # PDFTwAI - PDF Translation with AI
 *
 * A Rust library for translating the text of PDF documents between English
 * and Punjabi using AI providers.
 *
 * ## Features
 *
 * - Extract positioned text runs from PDF content streams
 * - Group runs into translation units (page, line or run)
 * - Translate using various AI providers:
 *   - OpenAI API
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Fit translated text back onto the page with word wrapping
 * - Render onto fresh pages or over the original pages
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `pdf`: PDF reading and writing:
 *   - `pdf::extractor`: Text run extraction
 *   - `pdf::fonts`: Font loading and metrics
 *   - `pdf::renderer`: Output document generation
 * - `layout`: Grouping of runs and placement of translated text
 * - `translation`: AI-powered translation services:
 *   - `translation::orchestrator`: Per-segment translation with failure tolerance
 *   - `translation::core`: Provider-backed translation service
 *   - `translation::cache`: Caching of repeated segments
 * - `session`: One document through the whole pipeline
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: Supported languages and script detection
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod layout;
pub mod pdf;
pub mod providers;
pub mod session;
pub mod translation;

pub use app_config::Config;
pub use errors::{AppError, PipelineError, ProviderError};
pub use language_utils::Language;
pub use session::{SessionOutcome, TranslationSession};
pub use translation::TranslationService;
