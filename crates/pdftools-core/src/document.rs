//! Page tree helpers shared by the page-level operations
//!
//! lopdf exposes pages through `Document::get_pages`, which walks the page
//! tree and resolves page numbers. Reordering, merging and flattening need a
//! bit more: inherited attributes have to be copied onto each page before the
//! page is moved under a different parent.

use crate::error::PdfToolsError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

/// Page attributes that a page may inherit from an ancestor `Pages` node.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page trees deeper than this are treated as malformed (or cyclic).
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when neither the page nor its ancestors carry a MediaBox.
pub const LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

pub(crate) fn load(bytes: &[u8]) -> Result<Document, PdfToolsError> {
    Document::load_mem(bytes).map_err(|e| PdfToolsError::ParseError(e.to_string()))
}

/// Prune unreachable objects, compress streams and serialize.
///
/// Refuses to write a document without pages.
pub(crate) fn save(doc: &mut Document) -> Result<Vec<u8>, PdfToolsError> {
    if doc.get_pages().is_empty() {
        return Err(PdfToolsError::EmptyDocument);
    }

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// Object id of the root `Pages` node referenced by the catalog.
pub(crate) fn pages_root_id(doc: &Document) -> Result<ObjectId, PdfToolsError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolsError::OperationError("No Root in trailer".into()))?;

    doc.get_dictionary(catalog_id)
        .map_err(|_| PdfToolsError::OperationError("Catalog not found".into()))?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolsError::OperationError("No Pages in catalog".into()))
}

/// Look up an attribute on the page or the nearest ancestor that defines it.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }

    None
}

/// Copy inherited attributes onto the page itself so it can be re-parented.
pub(crate) fn materialize_inherited(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<(), PdfToolsError> {
    let mut inherited = Vec::new();
    {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|_| PdfToolsError::OperationError(format!("Page {:?} not found", page_id)))?;

        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                inherited.push((key.to_vec(), value.clone()));
            }
        }
    }

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

/// Replace the page tree with a single-level tree holding `page_ids` in order.
///
/// Every page gets its inherited attributes materialized and its `Parent`
/// pointed at the root `Pages` node. Intermediate nodes become unreachable
/// and disappear on the next prune.
pub(crate) fn set_page_order(
    doc: &mut Document,
    page_ids: &[ObjectId],
) -> Result<(), PdfToolsError> {
    if page_ids.is_empty() {
        return Err(PdfToolsError::EmptyDocument);
    }

    let root_id = pages_root_id(doc)?;

    for &page_id in page_ids {
        materialize_inherited(doc, page_id)?;
        page_dict_mut(doc, page_id)?.set("Parent", Object::Reference(root_id));
    }

    let root = page_dict_mut(doc, root_id)?;
    root.set(
        "Kids",
        Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    root.set("Count", Object::Integer(page_ids.len() as i64));
    // Attributes now live on the pages themselves.
    for key in INHERITABLE_KEYS {
        root.remove(key);
    }

    Ok(())
}

pub(crate) fn page_dict_mut(
    doc: &mut Document,
    id: ObjectId,
) -> Result<&mut Dictionary, PdfToolsError> {
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| PdfToolsError::OperationError(format!("Object {:?} is not a dictionary", id)))
}

/// Effective rotation of a page, normalized to 0, 90, 180 or 270.
pub(crate) fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(normalize_rotation)
        .unwrap_or(0)
}

/// Normalize rotation to 0, 90, 180, or 270
pub(crate) fn normalize_rotation(angle: i64) -> i64 {
    angle.rem_euclid(360)
}

pub(crate) fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(*n as f64),
        _ => None,
    }
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }

    let mut result = [0.0; 4];
    for (slot, obj) in result.iter_mut().zip(array) {
        *slot = as_number(obj)?;
    }
    Some(result)
}

pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| parse_box_array(array))
        .unwrap_or(LETTER)
}

/// Page orientation
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i64,
    /// Orientation as displayed, i.e. after applying the rotation
    pub orientation: PageOrientation,
}

/// Size, rotation and orientation of every page in the document.
pub fn page_infos(bytes: &[u8]) -> Result<Vec<PageInfo>, PdfToolsError> {
    let doc = load(bytes)?;

    Ok(doc
        .get_pages()
        .into_iter()
        .map(|(page_num, page_id)| {
            let [x1, y1, x2, y2] = media_box(&doc, page_id);
            let (width, height) = ((x2 - x1).abs(), (y2 - y1).abs());
            let rotation = page_rotation(&doc, page_id);

            let (shown_w, shown_h) = if rotation % 180 == 90 {
                (height, width)
            } else {
                (width, height)
            };
            let orientation = if (shown_w - shown_h).abs() < 1.0 {
                PageOrientation::Square
            } else if shown_w > shown_h {
                PageOrientation::Landscape
            } else {
                PageOrientation::Portrait
            };

            PageInfo {
                page_num,
                width,
                height,
                rotation,
                orientation,
            }
        })
        .collect())
}
