use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils::{Language, LanguageDetector, ScriptDetector};
use crate::pdf::{ExtractedDocument, extract_document};
use crate::session::{SessionOutcome, TranslationSession};
use crate::translation::{ProgressCallback, TextTranslator, TranslationService};

/// What happened to one input file
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Written to the given path
    Translated(PathBuf),
    /// Output already existed and overwriting was not requested
    Skipped(PathBuf),
}

/// Counts of a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for PDF translation
pub struct Controller {
    config: Config,
    target: Language,
    translator: Arc<dyn TextTranslator>,
    detector: Arc<dyn LanguageDetector>,
    service: Option<Arc<TranslationService>>,
}

impl Controller {
    /// Create a controller translating through the configured provider
    pub fn with_config(config: Config) -> Result<Self> {
        let service = Arc::new(
            TranslationService::new(config.translation.clone()).context("Failed to create translation service")?,
        );
        let mut controller = Self::with_translator(config, service.clone())?;
        controller.service = Some(service);
        Ok(controller)
    }

    /// Create a controller around an explicit translator
    pub fn with_translator(config: Config, translator: Arc<dyn TextTranslator>) -> Result<Self> {
        let target = config.target()?;
        Ok(Self {
            config,
            target,
            translator,
            detector: Arc::new(ScriptDetector::default()),
            service: None,
        })
    }

    /// Check that the configured provider is reachable
    pub async fn test_connection(&self) -> Result<()> {
        match &self.service {
            Some(service) => service
                .test_connection()
                .await
                .context("Provider connection test failed"),
            None => Ok(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> Language {
        self.target
    }

    /// Extract runs and page geometry without translating
    pub fn extract(&self, input_file: &Path) -> Result<ExtractedDocument> {
        let bytes = FileManager::read_pdf(input_file, self.config.pipeline.max_input_bytes)?;
        extract_document(&bytes).with_context(|| format!("Failed to extract text from {:?}", input_file))
    }

    /// Translate one PDF into `output_dir`
    pub async fn run(&self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<FileStatus> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(input_file, output_dir, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<FileStatus> {
        let start_time = Instant::now();

        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = FileManager::output_path(input_file, output_dir, self.target.code());
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}, translation already exists (use -f to force overwrite)",
                input_file
            );
            return Ok(FileStatus::Skipped(output_path));
        }

        let pdf = FileManager::read_pdf(input_file, self.config.pipeline.max_input_bytes)?;
        let session = TranslationSession::open(&self.config)
            .await
            .map_err(|e| anyhow!("{}", e.user_message()).context(e.to_string()))?;

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        progress_bar.set_style(progress_style("segments"));
        progress_bar.set_message("Translating");
        let update: ProgressCallback<'_> = &|done, total| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
        };

        let result = session
            .run(
                pdf,
                self.target,
                self.translator.as_ref(),
                self.detector.as_ref(),
                Some(update),
            )
            .await;
        progress_bar.finish_and_clear();

        let outcome = result.map_err(|e| anyhow!("{}", e.user_message()).context(e.to_string()))?;

        FileManager::ensure_dir(output_dir)?;
        FileManager::write_bytes(&output_path, &outcome.pdf)?;

        Self::log_summary(&outcome, start_time.elapsed());
        if let Some(service) = &self.service {
            info!("Token usage: {}", service.usage().summary());
        }
        info!("Success: {:?}", output_path);
        Ok(FileStatus::Translated(output_path))
    }

    fn log_summary(outcome: &SessionOutcome, elapsed: Duration) {
        info!(
            "Translated {} segment(s) over {} page(s) {} in {}",
            outcome.total_segments - outcome.skipped_segments,
            outcome.pages,
            Language::pair_label(outcome.source, outcome.target),
            format_duration(elapsed)
        );
        if outcome.skipped_segments > 0 {
            warn!(
                "{} of {} segment(s) could not be translated and kept their original text",
                outcome.skipped_segments, outcome.total_segments
            );
        }
        if outcome.dropped_lines > 0 {
            warn!("{} line(s) did not fit on their page and were dropped", outcome.dropped_lines);
        }
    }

    /// Translate every PDF below `input_dir`, writing next to each input unless `output_dir` is given
    pub async fn run_folder(&self, input_dir: &Path, output_dir: Option<&Path>, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let pdf_files = FileManager::find_pdfs(input_dir)?;
        if pdf_files.is_empty() {
            return Err(anyhow!("No PDF files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(pdf_files.len() as u64));
        folder_pb.set_style(progress_style("files"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();
        for pdf_file in &pdf_files {
            let file_name = pdf_file.file_name().unwrap_or_default().to_string_lossy().to_string();
            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = output_dir
                .map(Path::to_path_buf)
                .or_else(|| pdf_file.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."));

            match self
                .run_with_progress(pdf_file, &target_dir, &multi_progress, force_overwrite)
                .await
            {
                Ok(FileStatus::Translated(_)) => summary.translated += 1,
                Ok(FileStatus::Skipped(_)) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Processed {} file(s) in {}: {} translated, {} skipped, {} failed",
            pdf_files.len(),
            format_duration(start_time.elapsed()),
            summary.translated,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }
}

fn progress_style(unit: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        ))
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Human readable duration, e.g. "1m 5s" or "0.250s"
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
