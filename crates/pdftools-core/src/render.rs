//! Page rasterization through PDFium
//!
//! Needs the PDFium shared library at runtime. It is looked up next to the
//! working directory and the executable before falling back to the system
//! library path.

use crate::error::PdfToolsError;
use crate::images::{ExtractedImage, ImageExtractOptions, ImageFormat};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_DPI: f32 = 300.0;

pub struct PdfiumLoader;

impl PdfiumLoader {
    /// Bind to the first PDFium library found on the search paths, then
    /// to the system library.
    pub fn load() -> Result<Pdfium, PdfToolsError> {
        for path in Self::search_paths() {
            if path.exists() {
                if let Ok(bindings) = Pdfium::bind_to_library(&path) {
                    debug!("Loaded PDFium from {}", path.display());
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| PdfToolsError::ConversionError(format!("Failed to load PDFium: {:?}", e)))
    }

    fn search_paths() -> Vec<PathBuf> {
        let name = Pdfium::pdfium_platform_library_name();
        let mut paths = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join("lib").join(&name));
        }
        if let Ok(exe) = std::env::current_exe() {
            if let Some(parent) = exe.parent() {
                paths.push(parent.join(&name));
                paths.push(parent.join("lib").join(&name));
            }
        }

        paths
    }
}

/// Render every page to PNG at `dpi`, named `{base}_p{nnn}.png`.
pub fn render_pages(
    bytes: &[u8],
    dpi: f32,
    options: &ImageExtractOptions,
) -> Result<Vec<ExtractedImage>, PdfToolsError> {
    if !(dpi > 0.0) {
        return Err(PdfToolsError::InvalidRange(format!(
            "DPI must be positive, got {}",
            dpi
        )));
    }

    let pdfium = PdfiumLoader::load()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| PdfToolsError::ParseError(format!("{:?}", e)))?;

    let config = PdfRenderConfig::new().scale_page_by_factor(dpi / 72.0);
    let mut rendered = Vec::new();

    for (index, page) in document.pages().iter().enumerate() {
        let page_number = index as u32 + 1;
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfToolsError::ConversionError(format!("Page {}: {:?}", page_number, e)))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let pixels = image::RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| {
                PdfToolsError::ImageError(format!("Page {}: bitmap size mismatch", page_number))
            })?;

        let mut png = Cursor::new(Vec::new());
        pixels.write_to(&mut png, image::ImageFormat::Png)?;

        rendered.push(ExtractedImage {
            page_number,
            index: 1,
            width,
            height,
            format: ImageFormat::Png,
            file_name: format!("{}_p{:03}.png", options.base_name, page_number),
            data: png.into_inner(),
        });
    }

    info!("Rendered {} pages at {} DPI", rendered.len(), dpi);
    Ok(rendered)
}
