//! Page-level edits: rotate, reorder and delete
//!
//! Rotation is applied through the page's `/Rotate` entry, so content
//! streams are never rewritten and the operation is lossless.

use crate::document::{self, normalize_rotation, page_dict_mut, page_rotation, set_page_order};
use crate::error::PdfToolsError;
use crate::validate_pages;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Clockwise page rotation in quarter turns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = PdfToolsError;

    fn try_from(angle: i64) -> Result<Self, Self::Error> {
        if angle % 90 != 0 {
            return Err(PdfToolsError::InvalidRange(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                angle
            )));
        }
        Ok(match normalize_rotation(angle) {
            0 => Rotation::Deg0,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl FromStr for Rotation {
    type Err = PdfToolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let angle: i64 = s
            .trim()
            .parse()
            .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid rotation: {}", s)))?;
        Rotation::try_from(angle)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One page of an arrangement: which source page goes next, and how much
/// to turn it relative to its current rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePlacement {
    /// Source page number (1-indexed)
    pub page: u32,
    #[serde(default)]
    pub rotation: Rotation,
}

impl PagePlacement {
    pub fn new(page: u32, rotation: Rotation) -> Self {
        Self { page, rotation }
    }
}

/// Parses `"3"` or `"3:90"`.
impl FromStr for PagePlacement {
    type Err = PdfToolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (page, rotation) = match s.split_once(':') {
            Some((page, rotation)) => (page, rotation.parse()?),
            None => (s, Rotation::Deg0),
        };
        let page = page
            .trim()
            .parse()
            .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid page: {}", page.trim())))?;
        Ok(Self { page, rotation })
    }
}

/// Parse a comma-separated arrangement such as `"3, 1:90, 2:180"`.
pub fn parse_arrangement(input: &str) -> Result<Vec<PagePlacement>, PdfToolsError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// Emit the listed pages in the listed order, each turned by its placement.
///
/// Pages not listed are dropped. A page may appear at most once.
pub fn arrange_pages(bytes: &[u8], placements: &[PagePlacement]) -> Result<Vec<u8>, PdfToolsError> {
    if placements.is_empty() {
        return Err(PdfToolsError::InvalidRange("No pages in arrangement".into()));
    }

    let mut doc = document::load(bytes)?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    let numbers: Vec<u32> = placements.iter().map(|p| p.page).collect();
    validate_pages(&numbers, page_count)?;

    let mut seen = HashSet::new();
    for &page in &numbers {
        if !seen.insert(page) {
            return Err(PdfToolsError::InvalidRange(format!(
                "Page {} listed more than once",
                page
            )));
        }
    }

    // Rotations are resolved before flattening, while inheritance still applies
    let ordered: Vec<_> = placements
        .iter()
        .map(|placement| {
            let page_id = pages[&placement.page];
            let rotation = normalize_rotation(
                page_rotation(&doc, page_id) + placement.rotation.degrees(),
            );
            (page_id, rotation)
        })
        .collect();

    let ids: Vec<_> = ordered.iter().map(|(id, _)| *id).collect();
    set_page_order(&mut doc, &ids)?;

    for (page_id, rotation) in ordered {
        let page = page_dict_mut(&mut doc, page_id)?;
        if rotation == 0 {
            page.remove(b"Rotate");
        } else {
            page.set("Rotate", rotation);
        }
        debug!("Page {:?} rotation set to {}", page_id, rotation);
    }

    info!(
        "Arranged {} of {} pages",
        placements.len(),
        page_count
    );
    document::save(&mut doc)
}

/// Rotate the listed pages (all pages when `pages` is empty), keeping order.
pub fn rotate_pages(
    bytes: &[u8],
    rotation: Rotation,
    pages: &[u32],
) -> Result<Vec<u8>, PdfToolsError> {
    let page_count = crate::get_page_count(bytes)?;
    validate_pages(pages, page_count)?;

    let selected: HashSet<u32> = pages.iter().copied().collect();
    let placements: Vec<PagePlacement> = (1..=page_count)
        .map(|page| {
            if selected.is_empty() || selected.contains(&page) {
                PagePlacement::new(page, rotation)
            } else {
                PagePlacement::new(page, Rotation::Deg0)
            }
        })
        .collect();

    arrange_pages(bytes, &placements)
}

/// Remove the selected pages. At least one page must remain.
pub fn delete_pages(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfToolsError> {
    if pages.is_empty() {
        return Err(PdfToolsError::InvalidRange(
            "No pages selected for deletion".into(),
        ));
    }

    let mut doc = document::load(bytes)?;
    let page_count = doc.get_pages().len() as u32;
    validate_pages(pages, page_count)?;

    let mut to_delete = pages.to_vec();
    to_delete.sort_unstable();
    to_delete.dedup();

    if to_delete.len() as u32 >= page_count {
        return Err(PdfToolsError::EmptyDocument);
    }

    // Delete in reverse order so earlier page numbers stay valid
    for &page_num in to_delete.iter().rev() {
        doc.delete_pages(&[page_num]);
    }

    info!(
        "Deleted {} pages, {} remain",
        to_delete.len(),
        page_count - to_delete.len() as u32
    );
    document::save(&mut doc)
}
