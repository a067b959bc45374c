use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("encrypted PDFs are not supported")]
    Encrypted,

    #[error("document has no pages")]
    NoPages,
}
