//! XLSX rows as text lines
//!
//! Uses the calamine crate for reading Excel files.

use crate::error::PdfToolsError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

/// Rows of the first worksheet, each rendered as `", "`-joined cell text.
pub fn spreadsheet_lines(bytes: &[u8]) -> Result<Vec<String>, PdfToolsError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| PdfToolsError::ConversionError(format!("Failed to open XLSX: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PdfToolsError::ConversionError("No sheets found in workbook".into()))?
        .map_err(|e| PdfToolsError::ConversionError(format!("Failed to read sheet: {}", e)))?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(cell_to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::xlsx::write_rows;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Bool(true)), "TRUE");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_reads_first_sheet_rows() {
        let workbook = write_rows(&[
            vec!["Name".to_string(), "Qty".to_string()],
            vec!["Apples".to_string(), "3".to_string()],
        ])
        .unwrap();

        let lines = spreadsheet_lines(&workbook).unwrap();
        assert_eq!(lines, vec!["Name, Qty".to_string(), "Apples, 3".to_string()]);
    }

    #[test]
    fn test_rejects_non_workbook() {
        assert!(spreadsheet_lines(b"plain text").is_err());
    }
}
