//! WordprocessingML writer

use super::{write_package, xml_text};
use crate::error::PdfToolsError;
use crate::text::PageText;
use tracing::debug;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxOptions {
    /// Start each PDF page on a new Word page
    pub page_breaks: bool,
}

impl Default for DocxOptions {
    fn default() -> Self {
        Self { page_breaks: true }
    }
}

/// One paragraph per text line, in page order.
pub fn write_docx(pages: &[PageText], options: &DocxOptions) -> Result<Vec<u8>, PdfToolsError> {
    let mut body = String::new();
    let mut paragraphs = 0usize;

    for (index, page) in pages.iter().enumerate() {
        let mut pending_break = options.page_breaks && index > 0;

        for line in page.lines() {
            body.push_str("<w:p><w:r>");
            if std::mem::take(&mut pending_break) {
                body.push_str(r#"<w:br w:type="page"/>"#);
            }
            body.push_str(r#"<w:t xml:space="preserve">"#);
            body.push_str(&xml_text(line));
            body.push_str("</w:t></w:r></w:p>");
            paragraphs += 1;
        }

        // Page without text still gets its break
        if pending_break {
            body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
    }

    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}<w:sectPr/></w:body></w:document>"
        ),
        body
    );

    debug!("Writing DOCX with {} paragraphs", paragraphs);
    write_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/document.xml", document),
    ])
}
