//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document, and converts mixed
//! inputs (images, spreadsheets, Word files) on the way in.

use crate::convert::{convert_to_pdf, InputDocument, TextLayout};
use crate::document::{self, set_page_order};
use crate::error::PdfToolsError;
use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Use the first document as the destination
/// 4. For each further document, shift its object ids past the
///    destination's highest id and import every object
/// 5. Rebuild the page tree with all pages in input order
/// 6. Prune, compress and return the merged result
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfToolsError> {
    if documents.is_empty() {
        return Err(PdfToolsError::OperationError("No documents to merge".into()));
    }

    if let [single] = documents.as_slice() {
        return Ok(single.clone());
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            PdfToolsError::ParseError(format!("Failed to load document {}: {}", i, e))
        })?;
        loaded.push(doc);
    }

    merge_loaded(loaded)
}

fn merge_loaded(documents: Vec<Document>) -> Result<Vec<u8>, PdfToolsError> {
    let mut documents = documents.into_iter();
    let mut dest = documents
        .next()
        .ok_or_else(|| PdfToolsError::OperationError("No documents to merge".into()))?;

    let mut page_ids: Vec<ObjectId> = dest.get_pages().into_values().collect();

    for source in documents {
        let offset = dest.max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        debug!(
            "Importing {} objects ({} pages) at id offset {}",
            source.objects.len(),
            source_pages.len(),
            offset
        );

        for (id, object) in source.objects {
            dest.objects
                .insert((id.0 + offset, id.1), remap_object_refs(object, offset));
        }
        page_ids.extend(source_pages.into_iter().map(|id| (id.0 + offset, id.1)));
        dest.max_id = dest.max_id.max(source.max_id + offset);
    }

    // Imported pages still point at their old Pages nodes, which now live
    // in `dest` under shifted ids, so inherited attributes resolve.
    set_page_order(&mut dest, &page_ids)?;

    info!("Merged into {} pages", page_ids.len());
    document::save(&mut dest)
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// An input left out of a combined document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedInput {
    pub name: String,
    pub reason: String,
}

/// Result of `combine_inputs`
#[derive(Debug, Clone)]
pub struct CombineOutcome {
    pub data: Vec<u8>,
    pub page_count: u32,
    pub skipped: Vec<SkippedInput>,
}

/// Convert every input to PDF and merge the results in order.
///
/// An input that cannot be converted or parsed is skipped with a warning.
/// Fails only when nothing usable is left.
pub fn combine_inputs(
    inputs: Vec<InputDocument>,
    layout: &TextLayout,
) -> Result<CombineOutcome, PdfToolsError> {
    if inputs.is_empty() {
        return Err(PdfToolsError::OperationError("No documents to merge".into()));
    }

    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for input in &inputs {
        match convert_to_pdf(input, layout).and_then(|bytes| document::load(&bytes)) {
            Ok(doc) => loaded.push(doc),
            Err(e) => {
                warn!("Skipping {}: {}", input.name, e);
                skipped.push(SkippedInput {
                    name: input.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if loaded.is_empty() {
        return Err(PdfToolsError::OperationError(format!(
            "None of the {} inputs could be converted",
            inputs.len()
        )));
    }

    let data = merge_loaded(loaded)?;
    let page_count = crate::get_page_count(&data)?;

    Ok(CombineOutcome {
        data,
        page_count,
        skipped,
    })
}
