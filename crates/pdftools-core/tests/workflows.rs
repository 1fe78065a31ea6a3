//! End-to-end runs of the document workflows through files on disk.

use pdftools_core::convert::{docx_lines, image_to_pdf, spreadsheet_lines, text_to_pdf};
use pdftools_core::export::xlsx::write_rows;
use pdftools_core::export::{write_docx, DocxOptions};
use pdftools_core::text::PageText;
use pdftools_core::{
    arrange_pages, delete_pages, extract_page_texts, get_page_count, page_infos, parse_arrangement,
    split_pages, PdfCommand, Rotation, TextFormat, TextLayout,
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

/// One page per label, each page reading only its label.
fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
    let per_page = 36;
    let lines: Vec<String> = labels
        .iter()
        .flat_map(|label| {
            let blanks = std::iter::repeat(String::new()).take(per_page - 1);
            std::iter::once(label.to_string()).chain(blanks)
        })
        .collect();
    text_to_pdf(&lines, &TextLayout::default()).unwrap()
}

fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn first_words(pdf: &[u8]) -> Vec<String> {
    extract_page_texts(pdf)
        .unwrap()
        .into_iter()
        .map(|p| p.text.split_whitespace().next().unwrap_or_default().to_string())
        .collect()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn test_labelled_fixture_has_one_page_per_label() {
    let pdf = labelled_pdf(&["Alpha", "Beta", "Gamma"]);
    assert_eq!(first_words(&pdf), vec!["Alpha", "Beta", "Gamma"]);
}

#[test]
fn test_combine_mixed_inputs_then_edit() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write(dir.path(), "text.pdf", &labelled_pdf(&["Alpha", "Beta"]));
    let photo = write(dir.path(), "photo.png", &png(200, 100));
    let sheet = write(
        dir.path(),
        "table.xlsx",
        &write_rows(&[vec!["Sheet".to_string(), "row".to_string()]]).unwrap(),
    );
    let job = PdfCommand::Combine {
        inputs: vec![pdf, photo, sheet],
        output: dir.path().join("combined_output.pdf"),
    };
    let result = job.execute().unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.metrics.page_count, 4);

    let combined = &result.files[0].data;
    let infos = page_infos(combined).unwrap();
    // 200x100 pixels at 100 DPI
    assert_eq!((infos[2].width, infos[2].height), (144.0, 72.0));

    let words = first_words(combined);
    assert_eq!(words[0], "Alpha");
    assert_eq!(words[1], "Beta");
    assert_eq!(words[3], "Sheet,");

    // Reverse the text pages, turning the first, and drop the rest
    let arranged = arrange_pages(combined, &parse_arrangement("2:90, 1").unwrap()).unwrap();
    assert_eq!(first_words(&arranged), vec!["Beta", "Alpha"]);
    let infos = page_infos(&arranged).unwrap();
    assert_eq!(infos[0].rotation, 90);
    assert_eq!(infos[1].rotation, 0);

    let trimmed = delete_pages(&arranged, &[1]).unwrap();
    assert_eq!(first_words(&trimmed), vec!["Alpha"]);
}

#[test]
fn test_combine_word_document_with_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write(dir.path(), "cover.pdf", &labelled_pdf(&["Cover"]));
    let docx = write_docx(&[PageText::new(1, "Minutes\nApproved")], &DocxOptions::default()).unwrap();
    let word = write(dir.path(), "minutes.docx", &docx);

    let result = PdfCommand::Combine {
        inputs: vec![pdf, word],
        output: dir.path().join("combined_output.pdf"),
    }
    .execute()
    .unwrap();

    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(first_words(&result.files[0].data), vec!["Cover", "Minutes"]);
}

#[test]
fn test_to_images_writes_flate_image_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "photo.pdf", &image_to_pdf(&png(40, 20)).unwrap());

    let result = PdfCommand::ToImages {
        input,
        output_dir: dir.path().join("imgs"),
        render: false,
        dpi: 300,
    }
    .execute()
    .unwrap();

    assert_eq!(result.files.len(), 1);
    assert!(result.files[0].path.ends_with("imgs/photo_p001.png"));
    let img = image::load_from_memory(&result.files[0].data).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (40, 20));
    assert!(img.pixels().all(|p| p.0 == [10, 120, 200]));
}

#[test]
fn test_split_every_page() {
    let pdf = labelled_pdf(&["One", "Two", "Three"]);
    let parts = split_pages(&pdf).unwrap();

    let names: Vec<&str> = parts.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["page_1.pdf", "page_2.pdf", "page_3.pdf"]);
    for (part, label) in parts.iter().zip(["One", "Two", "Three"]) {
        assert_eq!(get_page_count(&part.data).unwrap(), 1);
        assert_eq!(first_words(&part.data), vec![label]);
    }
}

#[test]
fn test_text_exports_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "report.pdf", &labelled_pdf(&["Intro", "Summary"]));

    let word = PdfCommand::ToWord {
        input: input.clone(),
        output: dir.path().join("report_p.docx"),
    }
    .execute()
    .unwrap();
    let lines: Vec<String> = docx_lines(&word.files[0].data)
        .unwrap()
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect();
    assert_eq!(lines, vec!["Intro", "Summary"]);

    let excel = PdfCommand::ToExcel {
        input: input.clone(),
        output: dir.path().join("report.xlsx"),
    }
    .execute()
    .unwrap();
    assert_eq!(
        spreadsheet_lines(&excel.files[0].data).unwrap(),
        vec!["Intro", "Summary"]
    );

    let text = PdfCommand::ExtractText {
        input,
        format: TextFormat::Txt,
        output: dir.path().join("report.txt"),
    }
    .execute()
    .unwrap();
    // Very little text: flagged as a possible scan
    assert_eq!(text.warnings.len(), 1);
    let plain = String::from_utf8(text.files[0].data.clone()).unwrap();
    assert!(plain.contains("Intro") && plain.contains("Summary"));
}

#[test]
fn test_rotate_all_pages_by_command() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "in.pdf", &labelled_pdf(&["A", "B"]));

    let job: PdfCommand = serde_json::from_value(serde_json::json!({
        "type": "Rotate",
        "input": input,
        "rotation": 270,
        "output": dir.path().join("out.pdf"),
    }))
    .unwrap();
    let result = job.execute().unwrap();

    let infos = page_infos(&result.files[0].data).unwrap();
    assert!(infos.iter().all(|p| p.rotation == Rotation::Deg270.degrees()));
}

#[test]
fn test_delete_everything_fails() {
    let pdf = labelled_pdf(&["Only"]);
    assert!(delete_pages(&pdf, &[1]).is_err());
}
