//! Fixtures shared by the CLI tests

use pdftools_core::convert::text_to_pdf;
use pdftools_core::TextLayout;
use std::path::{Path, PathBuf};

/// Write a one-page PDF holding `lines` and return its path.
pub(crate) fn write_text_pdf(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    let pdf = text_to_pdf(&lines, &TextLayout::default()).expect("layout text");
    let path = dir.join(name);
    std::fs::write(&path, pdf).expect("write fixture");
    path
}
