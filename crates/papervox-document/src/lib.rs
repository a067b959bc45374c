//! PDF document source and page preview rendering for PaperVox.
//!
//! [`PdfDocument`] answers the two questions playback needs: how many
//! pages, and what is the text of a page (or of the whole document).
//! [`PreviewRenderer`] produces bounded-size page bitmaps for display.

pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod preview;
pub mod source;

pub use error::DocumentError;
pub use preview::{PlaceholderRenderer, PreviewRenderer, RgbaImage};
pub use source::PdfDocument;

#[cfg(feature = "pdfium")]
pub use preview::pdfium::PdfiumRenderer;
