//! Loading source documents from disk.
//!
//! Plain text and markdown are read as UTF-8. PDF files are supported when the
//! `pdf` feature is enabled.

use std::fs;
use std::path::Path;

use tracing::{debug, error, info};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Load a document from `path`.
///
/// The document ID is the file name; `source_uri` is the path as given.
///
/// # Errors
///
/// Returns [`RagError::DocumentLoadFailure`] if the file is missing,
/// unreadable, cannot be parsed, or contains no text.
pub fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let source_id = path.display().to_string();

    let text = read_text(path)
        .map_err(|message| {
            error!(path = %source_id, error = %message, "failed to load document");
            RagError::DocumentLoadFailure { source_id: source_id.clone(), message }
        })?;

    if text.trim().is_empty() {
        return Err(RagError::DocumentLoadFailure {
            source_id,
            message: "document contains no text".to_string(),
        });
    }

    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_id.clone());

    info!(document.id = %id, chars = text.chars().count(), "loaded document");
    Ok(Document::new(id, text).with_source_uri(source_id))
}

fn is_pdf(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn read_text(path: &Path) -> std::result::Result<String, String> {
    if is_pdf(path) {
        debug!(path = %path.display(), "extracting PDF text");
        return read_pdf(path);
    }
    fs::read_to_string(path).map_err(|e| e.to_string())
}

#[cfg(feature = "pdf")]
fn read_pdf(path: &Path) -> std::result::Result<String, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| format!("invalid PDF: {e}"))
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(_path: &Path) -> std::result::Result<String, String> {
    Err("PDF support requires the `pdf` feature".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_text_with_file_name_as_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        fs::write(&path, "Paid leave is 20 days per year.").unwrap();

        let document = load_document(&path).unwrap();
        assert_eq!(document.id, "policy.txt");
        assert_eq!(document.text, "Paid leave is 20 days per year.");
        assert_eq!(document.source_uri.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, RagError::DocumentLoadFailure { .. }));
    }

    #[test]
    fn blank_file_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.md");
        fs::write(&path, "  \n\n ").unwrap();
        assert!(matches!(load_document(&path), Err(RagError::DocumentLoadFailure { .. })));
    }

    #[test]
    fn non_utf8_text_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        assert!(matches!(load_document(&path), Err(RagError::DocumentLoadFailure { .. })));
    }

    #[test]
    fn corrupt_pdf_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.PDF");
        fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(load_document(&path), Err(RagError::DocumentLoadFailure { .. })));
    }
}
