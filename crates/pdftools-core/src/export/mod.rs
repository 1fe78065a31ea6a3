//! Text layer to office formats
//!
//! Both writers produce the minimal Open XML package each format needs:
//! content types, package relationships and a single main part.

pub mod docx;
pub mod xlsx;

pub use docx::{write_docx, DocxOptions};
pub use xlsx::write_xlsx;

use crate::error::PdfToolsError;
use crate::text::{plain_text, PageText};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Output format of the OCR (text extraction) action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Docx,
    Txt,
}

impl TextFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TextFormat::Docx => "docx",
            TextFormat::Txt => "txt",
        }
    }
}

/// Render extracted text in the requested format. DOCX output has no page
/// breaks, the text simply flows.
pub fn export_text(pages: &[PageText], format: TextFormat) -> Result<Vec<u8>, PdfToolsError> {
    match format {
        TextFormat::Docx => write_docx(pages, &DocxOptions { page_breaks: false }),
        TextFormat::Txt => Ok(plain_text(pages).into_bytes()),
    }
}

/// Write `(path, contents)` parts into a deflated zip archive.
pub(crate) fn write_package(parts: &[(&str, String)]) -> Result<Vec<u8>, PdfToolsError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, contents) in parts {
        zip.start_file(*path, options)?;
        zip.write_all(contents.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Escape text for XML element content and strip characters XML 1.0 forbids.
pub(crate) fn xml_text(text: &str) -> String {
    let allowed: String = text
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || !c.is_control())
        .collect();
    quick_xml::escape::escape(allowed.as_str()).into_owned()
}
