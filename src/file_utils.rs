use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::errors::ValidationError;

static PDF_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A%PDF-\d\.\d").expect("valid PDF header pattern"));

/// Check size and header of an in-memory PDF
pub fn validate_pdf_bytes(bytes: &[u8], max_bytes: u64) -> Result<(), ValidationError> {
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(ValidationError::TooLarge { size, limit: max_bytes });
    }
    if !has_pdf_header(bytes) {
        return Err(ValidationError::NotPdf);
    }
    Ok(())
}

/// Whether the bytes start with a `%PDF-x.y` header
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    PDF_HEADER.is_match(&bytes[..bytes.len().min(16)])
}

/// File operations utility
pub struct FileManager;

impl FileManager {
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    /// Create a directory and its parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Output path for a translated document: `<stem>.<target>.pdf` in `output_dir`
    pub fn output_path<P1: AsRef<Path>, P2: AsRef<Path>>(input_file: P1, output_dir: P2, target_language: &str) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(target_language);
        output_filename.push_str(".pdf");

        output_dir.as_ref().join(output_filename)
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
            {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// PDFs below `dir`, skipping files this tool produced (`<stem>.<lang>.pdf`)
    pub fn find_pdfs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        Ok(Self::find_files(dir, "pdf")?
            .into_iter()
            .filter(|path| !Self::is_translated_output(path))
            .collect())
    }

    /// Whether a file name looks like `<stem>.en.pdf` or `<stem>.pa.pdf`
    pub fn is_translated_output(path: &Path) -> bool {
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_lowercase()).unwrap_or_default();
        stem.ends_with(".en") || stem.ends_with(".pa")
    }

    /// Read a PDF, rejecting oversize files and non-PDF content
    pub fn read_pdf<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to read file metadata: {:?}", path))?
            .len();
        if size > max_bytes {
            return Err(ValidationError::TooLarge { size, limit: max_bytes })
                .with_context(|| format!("Rejected {:?}", path));
        }

        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        validate_pdf_bytes(&bytes, max_bytes).with_context(|| format!("Rejected {:?}", path))?;
        Ok(bytes)
    }

    /// Write bytes to a file through a temporary sibling, so readers never see a partial file
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::ensure_dir(parent)?;

        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in: {:?}", parent))?;
        temp.write_all(bytes)
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        temp.persist(path)
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        Ok(())
    }

    /// Classify a file by extension, then by header
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        let is_pdf_extension = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"));
        if is_pdf_extension {
            return Ok(FileType::Pdf);
        }

        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        Ok(if has_pdf_header(&bytes) {
            FileType::Pdf
        } else {
            FileType::Unknown
        })
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Unknown,
}
