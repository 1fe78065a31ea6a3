//! DOCX paragraphs as text lines
//!
//! DOCX files are ZIP archives; the body text lives in `word/document.xml`
//! as `w:t` runs grouped into `w:p` paragraphs.

use crate::error::PdfToolsError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// One line per paragraph; explicit line breaks inside a paragraph start a
/// new line. Tabs are kept as `\t`.
pub fn docx_lines(bytes: &[u8]) -> Result<Vec<String>, PdfToolsError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PdfToolsError::ConversionError(format!("Failed to open DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| PdfToolsError::ConversionError("DOCX has no word/document.xml".into()))?
        .read_to_string(&mut xml)?;

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>, PdfToolsError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = false;
                    lines.push(std::mem::take(&mut current));
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => lines.push(String::new()),
                b"tab" if in_paragraph => current.push('\t'),
                b"br" if in_paragraph && is_page_break(e) => {}
                b"br" | b"cr" if in_paragraph => lines.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| PdfToolsError::ConversionError(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PdfToolsError::ConversionError(format!(
                    "Malformed document.xml at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(lines)
}

fn is_page_break(e: &BytesStart) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.local_name().as_ref() == b"type" && a.value.as_ref() == b"page")
}
