/*!
 * Error types for the pdftwai application.
 *
 * This module contains custom error types for the different stages of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 *
 * Fatal errors (`ParseError`, `ValidationError`, `RenderError`) abort a whole
 * request. `ProviderError` is scoped to a single segment and never aborts a batch.
 */

use thiserror::Error;

use crate::language_utils::Language;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Per-segment translation failures use the provider error type directly.
pub type TranslationProviderError = ProviderError;

/// Errors raised while reading an input PDF
#[derive(Error, Debug)]
pub enum ParseError {
    /// The byte stream is not a readable PDF
    #[error("Malformed PDF: {0}")]
    Malformed(String),

    /// The document is encrypted
    #[error("Encrypted PDFs are not supported")]
    Encrypted,

    /// A page could not be interpreted
    #[error("Unsupported PDF content on page {page}: {reason}")]
    Unsupported {
        /// 1-based page number
        page: u32,
        /// What went wrong
        reason: String,
    },
}

/// Caller-facing request validation failures
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Input does not look like a PDF
    #[error("Only PDF files are supported")]
    NotPdf,

    /// Input exceeds the configured size limit
    #[error("File size must be less than {limit} bytes (got {size})")]
    TooLarge {
        /// Size of the input in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Language code outside the supported pair
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Detected source language equals the requested target
    #[error("Source and target languages are the same ({0})")]
    SameLanguage(Language),

    /// Nothing to translate (e.g. a scanned document)
    #[error("No extractable text found in the document")]
    NoExtractableText,
}

/// Errors raised while producing the output PDF
#[derive(Error, Debug)]
pub enum RenderError {
    /// No document was loaded or created
    #[error("No document to render: {0}")]
    NoDocument(String),

    /// A font asset is missing or corrupt
    #[error("Font error: {0}")]
    Font(String),

    /// A remote font asset could not be fetched
    #[error("Failed to fetch font asset: {0}")]
    FontFetch(String),

    /// Building the document structure failed
    #[error("Document construction failed: {0}")]
    Document(String),

    /// Serializing the document failed
    #[error("Failed to save PDF: {0}")]
    Save(String),
}

/// Fatal errors of one translation request
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Request rejected
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Output could not be produced
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// Single message suitable for the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse(ParseError::Encrypted) => "Encrypted PDFs are not supported.".to_string(),
            Self::Parse(_) => "Failed to extract text from PDF.".to_string(),
            Self::Validation(e) => format!("{}.", e),
            Self::Render(_) => "Translation failed. Please try again.".to_string(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Fatal pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
