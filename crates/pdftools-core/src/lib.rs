//! PDF manipulation toolkit
//!
//! Every operation works on PDF bytes using lopdf:
//! - `combine_inputs` / `merge_documents`: concatenate PDFs, images and office files
//! - `split_pages` / `split_ranges` / `split_document`: extract pages
//! - `arrange_pages` / `rotate_pages` / `delete_pages`: page-level edits
//! - `extract_images`: embedded images to PNG/JPEG files
//! - `extract_page_texts` + `export`: text layer to DOCX, XLSX or plain text
//! - `optimize_document`: downsample and re-encode embedded images
//!   (`rasterize_document` with the `render` feature)

pub mod command;
pub mod convert;
mod decode;
pub mod document;
pub mod error;
pub mod export;
pub mod images;
pub mod merge;
pub mod optimize;
pub mod pages;
#[cfg(feature = "render")]
pub mod render;
pub mod split;
pub mod text;

#[cfg(test)]
pub(crate) mod fixtures;

pub use command::{JobOutput, OutputFile, PdfCommand, ProcessMetrics, ProcessResult};
pub use convert::{convert_to_pdf, InputDocument, InputKind, TextLayout};
pub use document::{page_infos, PageInfo, PageOrientation};
pub use error::PdfToolsError;
pub use export::TextFormat;
pub use images::{extract_images, ExtractedImage, ImageExtractOptions, ImageFormat};
pub use merge::{combine_inputs, merge_documents, CombineOutcome, SkippedInput};
pub use optimize::{estimate_optimized_size, optimize_document, OptimizeOptions, OptimizeReport};
#[cfg(feature = "render")]
pub use optimize::rasterize_document;
pub use pages::{
    arrange_pages, delete_pages, parse_arrangement, rotate_pages, PagePlacement, Rotation,
};
#[cfg(feature = "render")]
pub use render::render_pages;
pub use split::{split_document, split_pages, split_ranges, SplitPart};
pub use text::{extract_page_texts, looks_scanned, PageText};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfToolsError> {
    let doc = document::load(bytes)?;
    Ok(doc.get_pages().len() as u32)
}

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers
pub fn parse_ranges(input: &str) -> Result<Vec<u32>, PdfToolsError> {
    use std::collections::BTreeSet;

    let mut pages = BTreeSet::new();

    for (start, end) in parse_range_list(input)? {
        pages.extend(start..=end);
    }

    Ok(pages.into_iter().collect())
}

/// Parse "1-3, 5" into inclusive `(start, end)` pairs, keeping input order.
pub fn parse_range_list(input: &str) -> Result<Vec<(u32, u32)>, PdfToolsError> {
    let mut ranges = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_page(start, "start")?, parse_page(end, "end")?),
            None => {
                let page = parse_page(part, "page")?;
                (page, page)
            }
        };

        if start == 0 {
            return Err(PdfToolsError::InvalidRange(
                "Page numbers must be >= 1".into(),
            ));
        }
        if start > end {
            return Err(PdfToolsError::InvalidRange(format!(
                "Start {} > end {}",
                start, end
            )));
        }

        ranges.push((start, end));
    }

    Ok(ranges)
}

fn parse_page(value: &str, what: &str) -> Result<u32, PdfToolsError> {
    value
        .trim()
        .parse()
        .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid {}: {}", what, value.trim())))
}

/// Check that every page exists in a document with `page_count` pages.
pub(crate) fn validate_pages(pages: &[u32], page_count: u32) -> Result<(), PdfToolsError> {
    for &page in pages {
        if page == 0 {
            return Err(PdfToolsError::InvalidRange(
                "Page numbers must be >= 1".into(),
            ));
        }
        if page > page_count {
            return Err(PdfToolsError::InvalidRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_command_deserializes_combine() {
        let json = r#"{"type":"Combine","inputs":["a.pdf","b.png"],"output":"out.pdf"}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, PdfCommand::Combine { .. }));
    }

    #[test]
    fn test_command_deserializes_split_ranges() {
        let json = r#"{"type":"SplitRanges","input":"a.pdf","ranges":[[1,3],[5,5]],"output_dir":"out"}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, PdfCommand::SplitRanges { .. }));
    }

    #[test]
    fn test_get_page_count() {
        let pdf = fixtures::create_test_pdf(4, "Count");
        assert_eq!(get_page_count(&pdf).unwrap(), 4);
        assert!(get_page_count(b"not a pdf").is_err());
    }

    #[test]
    fn test_parse_ranges_single() {
        let result = parse_ranges("5").unwrap();
        assert_eq!(result, vec![5]);
    }

    #[test]
    fn test_parse_ranges_range() {
        let result = parse_ranges("1-3").unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_ranges_complex() {
        let result = parse_ranges("1-3, 5, 8-10").unwrap();
        assert_eq!(result, vec![1, 2, 3, 5, 8, 9, 10]);
    }

    #[test]
    fn test_parse_ranges_deduplicates() {
        let result = parse_ranges("1-3, 2-4").unwrap();
        assert_eq!(result, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_ranges_rejects_zero_and_reversed() {
        assert!(parse_ranges("0").is_err());
        assert!(parse_ranges("0-2").is_err());
        assert!(parse_ranges("4-2").is_err());
        assert!(parse_ranges("a-b").is_err());
    }

    #[test]
    fn test_parse_range_list_keeps_order() {
        let result = parse_range_list("8-10, 1-2").unwrap();
        assert_eq!(result, vec![(8, 10), (1, 2)]);
    }

    #[test]
    fn test_validate_pages() {
        assert!(validate_pages(&[1, 3], 3).is_ok());
        assert!(validate_pages(&[0], 3).is_err());
        assert!(validate_pages(&[4], 3).is_err());
    }

    proptest! {
        #[test]
        fn parse_ranges_is_sorted_and_unique(
            ranges in prop::collection::vec((1u32..50, 0u32..10), 1..8)
        ) {
            let input = ranges
                .iter()
                .map(|(start, len)| format!("{}-{}", start, start + len))
                .collect::<Vec<_>>()
                .join(", ");
            let pages = parse_ranges(&input).unwrap();

            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
            for (start, len) in ranges {
                prop_assert!(pages.contains(&start));
                prop_assert!(pages.contains(&(start + len)));
            }
        }
    }
}
