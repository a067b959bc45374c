use crate::error::DocumentError;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An opened PDF document.
///
/// Playback re-opens the file for every extraction, so this type holds no
/// long-lived file handle beyond the parsed object tree. Page indices are
/// zero-based; lopdf page numbers are one-based and the translation stays
/// inside this module.
#[derive(Debug)]
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    page_count: usize,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let doc = Document::load(path)?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(DocumentError::Encrypted);
        }
        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(DocumentError::NoPages);
        }
        debug!("Opened {} with {} pages", path.display(), page_count);
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Plain text of a single zero-based page.
    pub fn page_text(&self, page_index: usize) -> Result<String, DocumentError> {
        if page_index >= self.page_count {
            return Err(DocumentError::PageOutOfRange {
                page: page_index,
                page_count: self.page_count,
            });
        }
        Ok(self.doc.extract_text(&[(page_index + 1) as u32])?)
    }

    /// Plain text of the whole document, pages in order.
    pub fn full_text(&self) -> Result<String, DocumentError> {
        let numbers: Vec<u32> = (1..=self.page_count as u32).collect();
        Ok(self.doc.extract_text(&numbers)?)
    }
}
