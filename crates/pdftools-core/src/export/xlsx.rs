//! SpreadsheetML writer
//!
//! Cells are written as inline strings so no shared-string table is needed.

use super::{write_package, xml_text};
use crate::error::PdfToolsError;
use crate::text::PageText;
use tracing::debug;

const SHEET_NAME: &str = "Sheet1";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Every non-empty text line becomes one row, column A, in page order.
pub fn write_xlsx(pages: &[PageText]) -> Result<Vec<u8>, PdfToolsError> {
    let rows: Vec<Vec<String>> = pages
        .iter()
        .flat_map(|page| page.lines())
        .filter(|line| !line.trim().is_empty())
        .map(|line| vec![line.to_string()])
        .collect();

    write_rows(&rows)
}

/// Single-sheet workbook from a grid of strings.
pub fn write_rows(rows: &[Vec<String>]) -> Result<Vec<u8>, PdfToolsError> {
    let mut sheet_data = String::new();
    for (r, row) in rows.iter().enumerate() {
        let row_number = r + 1;
        sheet_data.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (c, value) in row.iter().enumerate() {
            sheet_data.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_name(c),
                row_number,
                xml_text(value)
            ));
        }
        sheet_data.push_str("</row>");
    }

    let sheet = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            "<sheetData>{}</sheetData></worksheet>"
        ),
        sheet_data
    );

    let workbook = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
        SHEET_NAME
    );

    debug!("Writing XLSX with {} rows", rows.len());
    write_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet),
    ])
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA).
fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Reader};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn test_one_row_per_nonempty_line() {
        let pages = vec![
            PageText::new(1, "Invoice 42\n\n  \nTotal: 10 & 5"),
            PageText::new(2, "Thanks"),
        ];
        let xlsx = write_xlsx(&pages).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(xlsx)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        let cells: Vec<String> = range
            .rows()
            .map(|row| row[0].to_string())
            .collect();
        assert_eq!(cells, vec!["Invoice 42", "Total: 10 & 5", "Thanks"]);
        assert_eq!(range.width(), 1);
    }

    #[test]
    fn test_empty_text_still_writes_workbook() {
        let xlsx = write_xlsx(&[PageText::new(1, "")]).unwrap();
        let workbook = open_workbook_auto_from_rs(Cursor::new(xlsx)).unwrap();
        assert_eq!(workbook.sheet_names().len(), 1);
    }
}
