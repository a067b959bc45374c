use crate::error::DocumentError;
use image::{ImageBuffer, Rgba};
use lopdf::{Document, Object};
use std::path::Path;
use tracing::debug;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

const FALLBACK_PAGE_PT: (f32, f32) = (612.0, 792.0); // US Letter

/// Renders a bounded-size bitmap of one page for on-screen preview.
///
/// Implementations must stay within `max_width` x `max_height` and preserve
/// the page's aspect ratio.
pub trait PreviewRenderer: Send + Sync {
    fn render_preview(
        &self,
        path: &Path,
        page_index: usize,
        max_width: u32,
        max_height: u32,
    ) -> Result<RgbaImage, DocumentError>;
}

/// Default renderer: a page-proportioned white sheet with a border, sized
/// from the page's MediaBox. It does not rasterize page content; that
/// needs a native PDF raster library, which the `pdfium` feature provides.
#[derive(Debug, Default)]
pub struct PlaceholderRenderer;

impl PlaceholderRenderer {
    pub fn new() -> Self {
        Self
    }

    fn media_box(doc: &Document, page_id: lopdf::ObjectId) -> Option<(f32, f32)> {
        let dict = doc.get_dictionary(page_id).ok()?;
        let media_box = match dict.get(b"MediaBox") {
            Ok(object) => Some(object),
            // MediaBox is inheritable from the parent Pages node.
            Err(_) => {
                let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
                doc.get_dictionary(parent_id).ok()?.get(b"MediaBox").ok()
            }
        }?;
        let media_box = resolve(doc, media_box)?;
        let values = media_box.as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let x0 = as_float(resolve(doc, &values[0])?)?;
        let y0 = as_float(resolve(doc, &values[1])?)?;
        let x1 = as_float(resolve(doc, &values[2])?)?;
        let y1 = as_float(resolve(doc, &values[3])?)?;
        Some(((x1 - x0).abs(), (y1 - y0).abs()))
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn as_float(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

impl PreviewRenderer for PlaceholderRenderer {
    fn render_preview(
        &self,
        path: &Path,
        page_index: usize,
        max_width: u32,
        max_height: u32,
    ) -> Result<RgbaImage, DocumentError> {
        let doc = Document::load(path)?;
        let pages = doc.get_pages();
        let page_count = pages.len();
        let page_id = pages
            .get(&((page_index + 1) as u32))
            .copied()
            .ok_or(DocumentError::PageOutOfRange {
                page: page_index,
                page_count,
            })?;

        let (page_w, page_h) = Self::media_box(&doc, page_id)
            .filter(|&(w, h)| w > 0.0 && h > 0.0)
            .unwrap_or(FALLBACK_PAGE_PT);

        let max_width = max_width.max(1);
        let max_height = max_height.max(1);
        let scale = (max_width as f32 / page_w).min(max_height as f32 / page_h);
        let width = ((page_w * scale).round() as u32).clamp(1, max_width);
        let height = ((page_h * scale).round() as u32).clamp(1, max_height);
        debug!(
            "Placeholder preview for page {} of {}: {}x{}",
            page_index,
            path.display(),
            width,
            height
        );

        let white = Rgba([255, 255, 255, 255]);
        let edge = Rgba([208, 208, 208, 255]);
        let mut image = RgbaImage::from_pixel(width, height, white);
        if width >= 3 && height >= 3 {
            for x in 0..width {
                image.put_pixel(x, 0, edge);
                image.put_pixel(x, height - 1, edge);
            }
            for y in 0..height {
                image.put_pixel(0, y, edge);
                image.put_pixel(width - 1, y, edge);
            }
        }
        Ok(image)
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium {
    use super::*;
    use pdfium_render::prelude::*;

    fn backend_error(message: String) -> DocumentError {
        DocumentError::Io(std::io::Error::new(std::io::ErrorKind::Other, message))
    }

    /// Renderer backed by a system pdfium library; produces real page pixels.
    pub struct PdfiumRenderer;

    impl PdfiumRenderer {
        pub fn from_system_library() -> Result<Self, DocumentError> {
            Pdfium::bind_to_system_library().map_err(|err| {
                backend_error(format!("failed to bind pdfium system library: {err}"))
            })?;
            Ok(Self)
        }
    }

    impl PreviewRenderer for PdfiumRenderer {
        fn render_preview(
            &self,
            path: &Path,
            page_index: usize,
            max_width: u32,
            max_height: u32,
        ) -> Result<RgbaImage, DocumentError> {
            let bindings = Pdfium::bind_to_system_library()
                .map_err(|err| backend_error(err.to_string()))?;
            let pdfium = Pdfium::new(bindings);
            let document = pdfium
                .load_pdf_from_file(path, None)
                .map_err(|err| backend_error(err.to_string()))?;
            let page = document
                .pages()
                .get(page_index as u16)
                .map_err(|_| DocumentError::PageOutOfRange {
                    page: page_index,
                    page_count: document.pages().len() as usize,
                })?;
            let config = PdfRenderConfig::new()
                .set_target_width(max_width as i32)
                .set_maximum_height(max_height as i32);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|err| backend_error(err.to_string()))?;
            Ok(bitmap.as_image().to_rgba8())
        }
    }
}
