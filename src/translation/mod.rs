/*!
 * Translation of text segments through AI providers.
 *
 * - `orchestrator`: drives per-segment translation in order, tolerating failures
 * - `core`: the provider-backed `TranslationService`
 * - `cache`: caching of repeated segments
 */

pub use self::core::{TokenUsageStats, TranslationService};
pub use self::orchestrator::{
    OrchestrationReport, ProgressCallback, SegmentFailure, TextTranslator, TranslationOrchestrator,
    TranslationResult, translate,
};

pub mod cache;
pub mod core;
pub mod orchestrator;
