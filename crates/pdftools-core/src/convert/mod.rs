//! Conversion of combine inputs to PDF
//!
//! Images become one page each. Spreadsheets and Word documents are reduced
//! to lines of text and laid out on Letter pages in Helvetica.

mod docx;
mod raster;
mod xlsx;

pub use self::docx::docx_lines;
pub(crate) use self::raster::deflate;
pub use self::raster::{image_to_pdf, image_to_pdf_at_dpi};
pub use self::xlsx::spreadsheet_lines;

use crate::error::PdfToolsError;
use lopdf::{content::Content, content::Operation, dictionary, Document, Object, Stream};
use std::path::Path;
use tracing::debug;

/// What a combine input is, judged by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Image,
    Spreadsheet,
    WordDocument,
}

impl InputKind {
    /// Unknown extensions are treated as PDF and fail later if they aren't.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" => InputKind::Image,
            "xlsx" => InputKind::Spreadsheet,
            "docx" => InputKind::WordDocument,
            _ => InputKind::Pdf,
        }
    }
}

/// A combine input held in memory
#[derive(Debug, Clone)]
pub struct InputDocument {
    /// Display name used in logs and skip reports
    pub name: String,
    pub kind: InputKind,
    pub data: Vec<u8>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, kind: InputKind, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, PdfToolsError> {
        let data = std::fs::read(path)?;
        Ok(Self::new(
            path.display().to_string(),
            InputKind::from_path(path),
            data,
        ))
    }
}

/// Page geometry for text laid out from spreadsheets and Word documents.
/// All values are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub font_size: f64,
    /// Distance between baselines
    pub line_height: f64,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 40.0,
            font_size: 12.0,
            line_height: 20.0,
        }
    }
}

impl TextLayout {
    /// Characters per line, using half an em as the average Helvetica width.
    fn max_chars(&self) -> usize {
        let usable = self.page_width - 2.0 * self.margin;
        ((usable / (self.font_size * 0.5)).floor() as usize).max(1)
    }

    fn lines_per_page(&self) -> usize {
        let usable = self.page_height - 2.0 * self.margin;
        ((usable / self.line_height).floor() as usize + 1).max(1)
    }
}

/// Convert one combine input to PDF bytes.
pub fn convert_to_pdf(
    input: &InputDocument,
    layout: &TextLayout,
) -> Result<Vec<u8>, PdfToolsError> {
    debug!("Converting {} ({:?})", input.name, input.kind);
    match input.kind {
        InputKind::Pdf => Ok(input.data.clone()),
        InputKind::Image => image_to_pdf(&input.data),
        InputKind::Spreadsheet => text_to_pdf(&spreadsheet_lines(&input.data)?, layout),
        InputKind::WordDocument => text_to_pdf(&docx_lines(&input.data)?, layout),
    }
}

/// Lay out lines of text top to bottom, starting a new page when the
/// cursor would fall below the bottom margin. Long lines are wrapped.
pub fn text_to_pdf(lines: &[String], layout: &TextLayout) -> Result<Vec<u8>, PdfToolsError> {
    let wrapped: Vec<String> = lines
        .iter()
        .flat_map(|line| wrap_line(&line.replace('\t', "    "), layout.max_chars()))
        .collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let chunks: Vec<&[String]> = if wrapped.is_empty() {
        vec![&wrapped[..]]
    } else {
        wrapped.chunks(layout.lines_per_page()).collect()
    };

    let mut kids = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let mut operations = Vec::with_capacity(chunk.len() * 5);
        let mut y = layout.page_height - layout.margin;
        for line in chunk {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), (layout.font_size as f32).into()]),
                Operation::new(
                    "Td",
                    vec![(layout.margin as f32).into(), (y as f32).into()],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(line),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ]);
            y -= layout.line_height;
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| PdfToolsError::ConversionError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (layout.page_width as f32).into(),
                (layout.page_height as f32).into(),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    crate::document::save(&mut doc)
}

fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let line = line.trim_end();
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        // Words longer than a line are hard-broken
        while current.chars().count() > max_chars {
            let head: String = current.chars().take(max_chars).collect();
            let tail: String = current.chars().skip(max_chars).collect();
            out.push(head);
            current = tail;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Encode text for a WinAnsiEncoding simple font. Unmappable characters
/// become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if c.is_control() => b' ',
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}
