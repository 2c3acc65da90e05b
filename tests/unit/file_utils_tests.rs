/*!
 * Tests for file system operations
 */

use pdftwai::errors::{ParseError, ValidationError};
use pdftwai::file_utils::{FileManager, FileType};
use pdftwai::pdf::extract;
use std::fs;

use crate::common;

#[test]
fn test_readPdf_withValidFile_shouldReturnBytes() {
    let dir = common::create_temp_dir().unwrap();
    let pdf = common::hello_world_pdf();
    let path = common::create_test_file(dir.path(), "doc.pdf", &pdf).unwrap();

    let bytes = FileManager::read_pdf(&path, 10 * 1024 * 1024).unwrap();
    assert_eq!(bytes, pdf);
}

#[test]
fn test_readPdf_withOversizeFile_shouldFailTooLarge() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "doc.pdf", &common::hello_world_pdf()).unwrap();

    let error = FileManager::read_pdf(&path, 16).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<ValidationError>(),
        Some(ValidationError::TooLarge { limit: 16, .. })
    ));
}

#[test]
fn test_readPdf_withTextFile_shouldFailNotPdf() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "notes.pdf", b"just some notes").unwrap();

    let error = FileManager::read_pdf(&path, 1024).unwrap_err();
    assert!(matches!(error.downcast_ref::<ValidationError>(), Some(ValidationError::NotPdf)));
}

#[test]
fn test_readPdf_withJunkBeforeHeader_shouldFailNotPdfLikeExtractor() {
    let dir = common::create_temp_dir().unwrap();
    let mut bytes = b"junk\n".to_vec();
    bytes.extend(common::hello_world_pdf());
    let path = common::create_test_file(dir.path(), "doc.pdf", &bytes).unwrap();

    let error = FileManager::read_pdf(&path, 10 * 1024 * 1024).unwrap_err();
    assert!(matches!(error.downcast_ref::<ValidationError>(), Some(ValidationError::NotPdf)));
    assert!(matches!(extract(&bytes), Err(ParseError::Malformed(_))));
}

#[test]
fn test_findPdfs_shouldSkipTranslatedOutputsAndSort() {
    let dir = common::create_temp_dir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();

    common::create_test_file(dir.path(), "b.pdf", b"%PDF-1.4").unwrap();
    common::create_test_file(dir.path(), "a.PDF", b"%PDF-1.4").unwrap();
    common::create_test_file(dir.path(), "a.pa.pdf", b"%PDF-1.4").unwrap();
    common::create_test_file(dir.path(), "readme.txt", b"hi").unwrap();
    common::create_test_file(&nested, "c.pdf", b"%PDF-1.4").unwrap();

    let found: Vec<String> = FileManager::find_pdfs(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(found, vec!["a.PDF", "b.pdf", "nested/c.pdf"]);
}

#[test]
fn test_writeBytes_withMissingParent_shouldCreateIt() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("out").join("doc.pa.pdf");

    FileManager::write_bytes(&path, b"%PDF-1.5").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.5");

    FileManager::write_bytes(&path, b"%PDF-1.7").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");
}

#[test]
fn test_detectFileType_shouldFallBackToHeader() {
    let dir = common::create_temp_dir().unwrap();
    let renamed = common::create_test_file(dir.path(), "scan.bin", b"%PDF-1.6\n").unwrap();
    let other = common::create_test_file(dir.path(), "image.png", b"\x89PNG").unwrap();

    assert_eq!(FileManager::detect_file_type(&renamed).unwrap(), FileType::Pdf);
    assert_eq!(FileManager::detect_file_type(&other).unwrap(), FileType::Unknown);
    assert!(FileManager::detect_file_type(dir.path().join("missing.pdf")).is_err());
}
