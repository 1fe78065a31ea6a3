//! Command-line surface
//!
//! Each subcommand resolves to an [`Action`]: most become a `PdfCommand`
//! job, the rest (`info`, size estimates, batches) are handled directly.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdftools_core::command::file_stem;
use pdftools_core::{
    parse_arrangement, parse_range_list, parse_ranges, PdfCommand, Rotation, TextFormat,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pdftools")]
#[command(version, about = "Combine, split, rotate, convert and shrink PDF files")]
pub struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Abandon a job after this many seconds (0 = no limit)
    #[arg(long, global = true, default_value_t = 0)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Combine PDFs, JPEG/PNG images, XLSX and DOCX files into one PDF
    Combine {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, default_value = "combined_output.pdf")]
        output: PathBuf,
    },
    /// One PDF per page, or per range with --ranges
    Split {
        input: PathBuf,
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,
        /// e.g. "1-3,5": writes pages_1-3.pdf and page_5.pdf
        #[arg(long)]
        ranges: Option<String>,
    },
    /// Rotate pages clockwise
    Rotate {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Multiple of 90, negative turns counter-clockwise
        #[arg(long, default_value_t = 90, allow_negative_numbers = true)]
        angle: i64,
        /// Pages to rotate, e.g. "1,3-4" (default: all)
        #[arg(long)]
        pages: Option<String>,
    },
    /// Reorder pages; unlisted pages are dropped
    Arrange {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// New order with optional extra rotation, e.g. "3,1:90,2"
        #[arg(long)]
        order: String,
    },
    /// Delete pages
    Delete {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// e.g. "2,4-5"
        #[arg(long)]
        pages: String,
    },
    /// Page count, sizes and rotation
    Info { input: PathBuf },
    /// Write the images embedded in each page (or render pages with --render)
    ToImages {
        input: PathBuf,
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,
        /// Rasterize whole pages with PDFium
        #[arg(long)]
        render: bool,
        #[arg(long, default_value_t = 300)]
        dpi: u32,
    },
    /// Text layer to a Word document, one page per PDF page
    ToWord {
        input: PathBuf,
        #[arg(short = 'd', long, conflicts_with = "output")]
        output_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Text layer to a spreadsheet, one row per line
    ToExcel {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Shrink a PDF by downsampling embedded images
    Optimize {
        input: PathBuf,
        #[arg(short, long, required_unless_present = "estimate_only")]
        output: Option<PathBuf>,
        /// 0 = lossless cleanup only, 100 = smallest
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
        /// Print the expected size and exit
        #[arg(long)]
        estimate_only: bool,
        /// Render whole pages at a level-dependent DPI (needs the `render` feature)
        #[arg(long)]
        rasterize: bool,
    },
    /// Extract the text layer (no image recognition)
    Ocr {
        input: PathBuf,
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = OcrFormat::Docx)]
        format: OcrFormat,
    },
    /// Run a JSON list of jobs
    Batch {
        jobs: PathBuf,
        /// Continue after a failed job
        #[arg(long)]
        keep_going: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrFormat {
    Docx,
    Txt,
}

impl From<OcrFormat> for TextFormat {
    fn from(format: OcrFormat) -> Self {
        match format {
            OcrFormat::Docx => TextFormat::Docx,
            OcrFormat::Txt => TextFormat::Txt,
        }
    }
}

/// What a parsed command line asks for
#[derive(Debug, PartialEq)]
pub enum Action {
    Job(PdfCommand),
    Info(PathBuf),
    Estimate { input: PathBuf, level: u8 },
    Batch { jobs: PathBuf, keep_going: bool },
}

impl Command {
    /// Validate arguments and fill in default output names.
    pub fn into_action(self) -> Result<Action> {
        let job = match self {
            Command::Combine { inputs, output } => PdfCommand::Combine { inputs, output },
            Command::Split {
                input,
                output_dir,
                ranges: Some(ranges),
            } => PdfCommand::SplitRanges {
                input,
                ranges: parse_range_list(&ranges).context("Invalid --ranges")?,
                output_dir,
            },
            Command::Split {
                input,
                output_dir,
                ranges: None,
            } => PdfCommand::Split { input, output_dir },
            Command::Rotate {
                input,
                output,
                angle,
                pages,
            } => PdfCommand::Rotate {
                input,
                rotation: Rotation::try_from(angle).context("Invalid --angle")?,
                pages: match pages {
                    Some(pages) => parse_ranges(&pages).context("Invalid --pages")?,
                    None => Vec::new(),
                },
                output,
            },
            Command::Arrange {
                input,
                output,
                order,
            } => PdfCommand::Arrange {
                input,
                placements: parse_arrangement(&order).context("Invalid --order")?,
                output,
            },
            Command::Delete {
                input,
                output,
                pages,
            } => PdfCommand::Delete {
                input,
                pages: parse_ranges(&pages).context("Invalid --pages")?,
                output,
            },
            Command::Info { input } => return Ok(Action::Info(input)),
            Command::ToImages {
                input,
                output_dir,
                render,
                dpi,
            } => PdfCommand::ToImages {
                input,
                output_dir,
                render,
                dpi,
            },
            Command::ToWord {
                input,
                output_dir,
                output,
            } => {
                let output = output.unwrap_or_else(|| {
                    derived_path(output_dir.as_deref(), &input, "_p", "docx")
                });
                PdfCommand::ToWord { input, output }
            }
            Command::ToExcel { input, output } => {
                let output = output.unwrap_or_else(|| derived_path(None, &input, "", "xlsx"));
                PdfCommand::ToExcel { input, output }
            }
            Command::Optimize {
                input,
                level,
                estimate_only: true,
                ..
            } => return Ok(Action::Estimate { input, level }),
            Command::Optimize {
                input,
                output,
                level,
                rasterize,
                ..
            } => PdfCommand::Optimize {
                input,
                level,
                rasterize,
                output: output.context("--output is required unless --estimate-only")?,
            },
            Command::Ocr {
                input,
                output_dir,
                format,
            } => {
                let format = TextFormat::from(format);
                let output = derived_path(Some(&output_dir), &input, "", format.extension());
                PdfCommand::ExtractText {
                    input,
                    format,
                    output,
                }
            }
            Command::Batch { jobs, keep_going } => return Ok(Action::Batch { jobs, keep_going }),
        };

        Ok(Action::Job(job))
    }
}

/// `{dir}/{stem}{suffix}.{ext}`, in the current directory when `dir` is None.
fn derived_path(dir: Option<&Path>, input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let name = format!("{}{}.{}", file_stem(input), suffix, ext);
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
