//! Job descriptions and their execution
//!
//! A batch file is a JSON array of `PdfCommand`s tagged by `type`, e.g.
//! `{"type":"Delete","input":"a.pdf","pages":[2],"output":"b.pdf"}`.
//!
//! `PdfCommand::execute` reads its inputs and returns every output in
//! memory. Nothing is written to disk until the caller has the result, so a
//! failed or abandoned job never leaves partial files behind.

use crate::convert::{InputDocument, TextLayout};
use crate::error::PdfToolsError;
use crate::export::{export_text, write_docx, write_xlsx, DocxOptions, TextFormat};
use crate::images::ImageExtractOptions;
use crate::optimize::{OptimizeOptions, OptimizeReport};
use crate::pages::{PagePlacement, Rotation};
use crate::text::{extract_page_texts, looks_scanned};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

fn default_dpi() -> u32 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Combine {
        inputs: Vec<PathBuf>,
        output: PathBuf,
    },
    Split {
        input: PathBuf,
        output_dir: PathBuf,
    },
    SplitRanges {
        input: PathBuf,
        ranges: Vec<(u32, u32)>,
        output_dir: PathBuf,
    },
    Arrange {
        input: PathBuf,
        placements: Vec<PagePlacement>,
        output: PathBuf,
    },
    Rotate {
        input: PathBuf,
        rotation: Rotation,
        /// Pages to rotate; empty means all pages
        #[serde(default)]
        pages: Vec<u32>,
        output: PathBuf,
    },
    Delete {
        input: PathBuf,
        pages: Vec<u32>,
        output: PathBuf,
    },
    ToImages {
        input: PathBuf,
        output_dir: PathBuf,
        /// Rasterize pages through PDFium instead of extracting embedded images
        #[serde(default)]
        render: bool,
        #[serde(default = "default_dpi")]
        dpi: u32,
    },
    ToWord {
        input: PathBuf,
        output: PathBuf,
    },
    ToExcel {
        input: PathBuf,
        output: PathBuf,
    },
    Optimize {
        input: PathBuf,
        level: u8,
        /// Render whole pages instead of recompressing embedded images
        #[serde(default)]
        rasterize: bool,
        output: PathBuf,
    },
    ExtractText {
        input: PathBuf,
        #[serde(default)]
        format: TextFormat,
        output: PathBuf,
    },
}

impl PdfCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PdfCommand::Combine { .. } => "combine",
            PdfCommand::Split { .. } => "split",
            PdfCommand::SplitRanges { .. } => "split-ranges",
            PdfCommand::Arrange { .. } => "arrange",
            PdfCommand::Rotate { .. } => "rotate",
            PdfCommand::Delete { .. } => "delete",
            PdfCommand::ToImages { .. } => "to-images",
            PdfCommand::ToWord { .. } => "to-word",
            PdfCommand::ToExcel { .. } => "to-excel",
            PdfCommand::Optimize { .. } => "optimize",
            PdfCommand::ExtractText { .. } => "ocr",
        }
    }

    /// Run the job to completion, keeping all outputs in memory.
    ///
    /// Blocking: reads input files and does CPU-bound PDF work.
    pub fn execute(&self) -> Result<JobOutput, PdfToolsError> {
        let start = Instant::now();
        debug!("Executing {} job", self.name());

        let mut warnings = Vec::new();
        let mut optimize_report = None;
        let (files, input_size, page_count) = match self {
            PdfCommand::Combine { inputs, output } => {
                let mut documents = Vec::with_capacity(inputs.len());
                for path in inputs {
                    match InputDocument::from_path(path) {
                        Ok(doc) => documents.push(doc),
                        Err(e) => {
                            warn!("Skipping {}: {}", path.display(), e);
                            warnings.push(format!("Skipped {}: {}", path.display(), e));
                        }
                    }
                }
                let input_size: usize = documents.iter().map(|d| d.data.len()).sum();

                let outcome = crate::merge::combine_inputs(documents, &TextLayout::default())?;
                warnings.extend(
                    outcome
                        .skipped
                        .iter()
                        .map(|s| format!("Skipped {}: {}", s.name, s.reason)),
                );
                (
                    vec![OutputFile::new(output, outcome.data)],
                    input_size,
                    outcome.page_count,
                )
            }
            PdfCommand::Split { input, output_dir } => {
                let bytes = std::fs::read(input)?;
                let parts = crate::split::split_pages(&bytes)?;
                let page_count = parts.len() as u32;
                let files = parts
                    .into_iter()
                    .map(|part| OutputFile::new(output_dir.join(&part.file_name), part.data))
                    .collect();
                (files, bytes.len(), page_count)
            }
            PdfCommand::SplitRanges {
                input,
                ranges,
                output_dir,
            } => {
                let bytes = std::fs::read(input)?;
                let parts = crate::split::split_ranges(&bytes, ranges)?;
                let files = parts
                    .into_iter()
                    .map(|part| OutputFile::new(output_dir.join(&part.file_name), part.data))
                    .collect();
                (files, bytes.len(), crate::get_page_count(&bytes)?)
            }
            PdfCommand::Arrange {
                input,
                placements,
                output,
            } => single_pdf(input, output, |bytes| {
                crate::pages::arrange_pages(bytes, placements)
            })?,
            PdfCommand::Rotate {
                input,
                rotation,
                pages,
                output,
            } => single_pdf(input, output, |bytes| {
                crate::pages::rotate_pages(bytes, *rotation, pages)
            })?,
            PdfCommand::Delete {
                input,
                pages,
                output,
            } => single_pdf(input, output, |bytes| crate::pages::delete_pages(bytes, pages))?,
            PdfCommand::ToImages {
                input,
                output_dir,
                render,
                dpi,
            } => {
                let bytes = std::fs::read(input)?;
                let options = ImageExtractOptions {
                    base_name: file_stem(input),
                };
                let mut images = if *render {
                    render_images(&bytes, *dpi, &options)?
                } else {
                    crate::images::extract_images(&bytes, &options)?
                };
                if images.is_empty() && !*render && cfg!(feature = "render") {
                    warnings.push("No embedded images, rendering pages instead".to_string());
                    images = render_images(&bytes, *dpi, &options)?;
                }
                if images.is_empty() {
                    warnings.push("No extractable images found".to_string());
                }
                let files = images
                    .into_iter()
                    .map(|img| OutputFile::new(output_dir.join(&img.file_name), img.data))
                    .collect();
                (files, bytes.len(), crate::get_page_count(&bytes)?)
            }
            PdfCommand::ToWord { input, output } => {
                let bytes = std::fs::read(input)?;
                let pages = extract_page_texts(&bytes)?;
                let docx = write_docx(&pages, &DocxOptions { page_breaks: true })?;
                (vec![OutputFile::new(output, docx)], bytes.len(), pages.len() as u32)
            }
            PdfCommand::ToExcel { input, output } => {
                let bytes = std::fs::read(input)?;
                let pages = extract_page_texts(&bytes)?;
                let xlsx = write_xlsx(&pages)?;
                (vec![OutputFile::new(output, xlsx)], bytes.len(), pages.len() as u32)
            }
            PdfCommand::Optimize {
                input,
                level,
                rasterize,
                output,
            } => {
                let bytes = std::fs::read(input)?;
                let options = OptimizeOptions::new(*level)?;
                let (data, report) = if *rasterize {
                    rasterize_pdf(&bytes, &options)?
                } else {
                    crate::optimize::optimize_document(&bytes, &options)?
                };
                if report.optimized_size >= report.original_size {
                    warnings.push(format!(
                        "Optimized file is not smaller ({} -> {} bytes)",
                        report.original_size, report.optimized_size
                    ));
                }
                optimize_report = Some(report);
                let page_count = crate::get_page_count(&data)?;
                (vec![OutputFile::new(output, data)], bytes.len(), page_count)
            }
            PdfCommand::ExtractText {
                input,
                format,
                output,
            } => {
                let bytes = std::fs::read(input)?;
                let pages = extract_page_texts(&bytes)?;
                if looks_scanned(&pages) {
                    warn!("{} has almost no text layer", input.display());
                    warnings.push(
                        "Document has almost no text layer; it may be a scan that needs OCR"
                            .to_string(),
                    );
                }
                let data = export_text(&pages, *format)?;
                (vec![OutputFile::new(output, data)], bytes.len(), pages.len() as u32)
            }
        };

        let metrics = ProcessMetrics {
            input_size_bytes: input_size,
            output_size_bytes: files.iter().map(|f| f.data.len()).sum(),
            page_count,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        Ok(JobOutput {
            files,
            warnings,
            metrics,
            optimize_report,
        })
    }
}

/// Read one PDF, transform it, produce one PDF.
fn single_pdf(
    input: &Path,
    output: &Path,
    transform: impl FnOnce(&[u8]) -> Result<Vec<u8>, PdfToolsError>,
) -> Result<(Vec<OutputFile>, usize, u32), PdfToolsError> {
    let bytes = std::fs::read(input)?;
    let data = transform(&bytes)?;
    let page_count = crate::get_page_count(&data)?;
    Ok((vec![OutputFile::new(output, data)], bytes.len(), page_count))
}

#[cfg(feature = "render")]
fn render_images(
    bytes: &[u8],
    dpi: u32,
    options: &ImageExtractOptions,
) -> Result<Vec<crate::images::ExtractedImage>, PdfToolsError> {
    crate::render::render_pages(bytes, dpi as f32, options)
}

#[cfg(not(feature = "render"))]
fn render_images(
    _bytes: &[u8],
    _dpi: u32,
    _options: &ImageExtractOptions,
) -> Result<Vec<crate::images::ExtractedImage>, PdfToolsError> {
    Err(PdfToolsError::UnsupportedInput(
        "page rendering needs the `render` feature".into(),
    ))
}

#[cfg(feature = "render")]
fn rasterize_pdf(
    bytes: &[u8],
    options: &OptimizeOptions,
) -> Result<(Vec<u8>, OptimizeReport), PdfToolsError> {
    crate::optimize::rasterize_document(bytes, options)
}

#[cfg(not(feature = "render"))]
fn rasterize_pdf(
    _bytes: &[u8],
    _options: &OptimizeOptions,
) -> Result<(Vec<u8>, OptimizeReport), PdfToolsError> {
    Err(PdfToolsError::UnsupportedInput(
        "page rasterization needs the `render` feature".into(),
    ))
}

/// File stem used to name derived outputs, `document` if there is none.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}

/// A file a job wants written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

/// Everything a successful job produced
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub files: Vec<OutputFile>,
    /// Non-fatal problems worth reporting, such as skipped inputs
    pub warnings: Vec<String>,
    pub metrics: ProcessMetrics,
    /// Size accounting of an optimize job
    pub optimize_report: Option<OptimizeReport>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessResult {
    pub command: String,
    pub success: bool,
    /// Files written by the job
    pub outputs: Vec<PathBuf>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

impl ProcessResult {
    pub fn succeeded(command: &str, outputs: Vec<PathBuf>, metrics: ProcessMetrics) -> Self {
        Self {
            command: command.to_string(),
            success: true,
            outputs,
            error: None,
            metrics: Some(metrics),
        }
    }

    pub fn failed(command: &str, error: impl ToString) -> Self {
        Self {
            command: command.to_string(),
            success: false,
            outputs: Vec::new(),
            error: Some(error.to_string()),
            metrics: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub processing_time_ms: u64,
}
