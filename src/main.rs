#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use pdftwai::app_config::{Config, LogLevel, RenderMode, TranslationProvider};
use pdftwai::app_controller::Controller;
use pdftwai::layout::GroupingStrategy;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    OpenAI,
    Anthropic,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliRenderMode {
    /// Translated text on blank pages
    Fresh,
    /// Translated text drawn over the original pages
    Overlay,
}

impl From<CliRenderMode> for RenderMode {
    fn from(mode: CliRenderMode) -> Self {
        match mode {
            CliRenderMode::Fresh => RenderMode::Fresh,
            CliRenderMode::Overlay => RenderMode::Overlay,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliGrouping {
    Page,
    Line,
    Run,
}

impl From<CliGrouping> for GroupingStrategy {
    fn from(grouping: CliGrouping) -> Self {
        match grouping {
            CliGrouping::Page => GroupingStrategy::Page,
            CliGrouping::Line => GroupingStrategy::Line {
                tolerance: pdftwai::layout::grouping::DEFAULT_LINE_TOLERANCE,
            },
            CliGrouping::Run => GroupingStrategy::Run,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate PDF documents (default command)
    Translate(TranslateArgs),

    /// Print the positioned text runs of a PDF as JSON
    Extract {
        /// PDF file to read
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,
    },

    /// Generate shell completions for pdftwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input PDF file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Directory for translated files (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Target language code ('en' or 'pa')
    #[arg(short, long)]
    target_language: Option<String>,

    /// How the translated text is placed on pages
    #[arg(long, value_enum)]
    mode: Option<CliRenderMode>,

    /// How text runs are grouped into translation units
    #[arg(short, long, value_enum)]
    grouping: Option<CliGrouping>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// PDFTwAI - PDF Translation with AI
///
/// Translates the text of PDF documents between English and Punjabi using
/// AI providers (OpenAI, Anthropic, Ollama) and renders a new PDF.
#[derive(Parser, Debug)]
#[command(name = "pdftwai")]
#[command(version)]
#[command(about = "AI-powered PDF translation between English and Punjabi")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "PDFTwAI extracts the text of PDF documents, translates it using AI providers and renders a translated PDF.

EXAMPLES:
    pdftwai report.pdf                          # Translate using default config
    pdftwai -f report.pdf                       # Force overwrite existing files
    pdftwai -p anthropic report.pdf             # Use a specific provider
    pdftwai -t en -o out/ report.pa.pdf         # Translate Punjabi to English into out/
    pdftwai --mode overlay report.pdf           # Draw translations over the original pages
    pdftwai --log-level debug /documents/       # Process an entire directory
    pdftwai extract report.pdf > runs.json      # Dump positioned text runs
    pdftwai completions bash > pdftwai.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (default: gpt-4o-mini, requires OPENAI_API_KEY)
    anthropic - Anthropic Claude API (requires ANTHROPIC_API_KEY)
    ollama    - Local Ollama server (default: llama3.2:3b)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    /// Install the global logger; the effective level is adjusted later with `log::set_max_level`
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => " ",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }

    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "pdftwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Extract {
            input_file,
            config_path,
        }) => run_extract(&input_file, &config_path),
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

fn run_extract(input_file: &Path, config_path: &str) -> Result<()> {
    let config = Config::load_or_create(Path::new(config_path))?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    let document = controller.extract(input_file)?;
    let json = serde_json::to_string_pretty(&document).context("Failed to serialize extracted runs")?;
    println!("{}", json);
    Ok(())
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(target) = &options.target_language {
        config.target_language = target.clone();
    }
    if let Some(mode) = &options.mode {
        config.pipeline.render.mode = mode.clone().into();
    }
    if let Some(grouping) = &options.grouping {
        config.pipeline.grouping = grouping.clone().into();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    let env_key = match config.translation.provider {
        TranslationProvider::OpenAI => options.openai_api_key.as_ref(),
        TranslationProvider::Anthropic => options.anthropic_api_key.as_ref(),
        TranslationProvider::Ollama => None,
    };
    if let Some(key) = env_key.filter(|k| !k.is_empty()) {
        let provider_config = config.translation.active_provider_config_mut();
        if provider_config.api_key.is_empty() {
            provider_config.api_key = key.clone();
        }
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cli_level) = &options.log_level {
        log::set_max_level(LogLevel::from(cli_level.clone()).to_level_filter());
    }

    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let mut config = Config::load_or_create(Path::new(&options.config_path))?;
    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    info!(
        "Using {} ({}) to translate into {}",
        config.translation.provider.display_name(),
        config.translation.get_model(),
        config.target()?.name()
    );

    let controller = Controller::with_config(config)?;

    if input_path.is_file() {
        let output_dir = options
            .output_dir
            .clone()
            .or_else(|| input_path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        controller
            .run(&input_path, &output_dir, options.force_overwrite)
            .await?;
    } else if input_path.is_dir() {
        let summary = controller
            .run_folder(&input_path, options.output_dir.as_deref(), options.force_overwrite)
            .await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} file(s) failed to translate", summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
