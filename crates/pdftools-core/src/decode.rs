//! Image stream decoding
//!
//! lopdf refuses to decompress image streams, so Flate data and the PNG/TIFF
//! predictors declared in `/DecodeParms` are undone here.

use crate::error::PdfToolsError;
use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object};
use std::io::Read;

/// Inflate a zlib stream.
pub(crate) fn inflate(data: &[u8]) -> Result<Vec<u8>, PdfToolsError> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| PdfToolsError::ImageError(format!("Flate data corrupt: {}", e)))?;
    Ok(out)
}

/// Bytes needed for `width × height` samples of `components` bytes each,
/// or `None` if that does not fit in memory's address space.
pub(crate) fn sample_len(width: u32, height: u32, components: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(components)
}

/// Predictor settings from a `/DecodeParms` dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Predictor {
    pub kind: i64,
    pub colors: usize,
    pub columns: usize,
}

impl Predictor {
    /// Read `/DecodeParms` of an image stream. 8-bit samples are assumed.
    pub fn from_stream_dict(doc: &Document, dict: &Dictionary) -> Self {
        let params = match dict.get(b"DecodeParms") {
            Ok(Object::Dictionary(params)) => Some(params),
            Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
            // One entry per filter; only single-filter images get here
            Ok(Object::Array(items)) => items.first().and_then(|item| match item {
                Object::Dictionary(params) => Some(params),
                Object::Reference(id) => doc.get_dictionary(*id).ok(),
                _ => None,
            }),
            _ => None,
        };

        let int = |key: &[u8], default: i64| {
            params
                .and_then(|p| p.get(key).ok())
                .and_then(|obj| obj.as_i64().ok())
                .unwrap_or(default)
        };
        Self {
            kind: int(b"Predictor", 1),
            colors: int(b"Colors", 1).max(1) as usize,
            columns: int(b"Columns", 1).max(1) as usize,
        }
    }

    /// Reverse the prediction. Errors on unknown predictors and on data that
    /// does not split into whole rows.
    pub fn apply(&self, data: Vec<u8>) -> Result<Vec<u8>, PdfToolsError> {
        let row_len = self
            .columns
            .checked_mul(self.colors)
            .ok_or_else(|| PdfToolsError::ImageError("Predictor row too long".into()))?;

        match self.kind {
            1 => Ok(data),
            2 => undo_tiff(data, row_len, self.colors),
            10..=15 => undo_png(&data, row_len, self.colors),
            other => Err(PdfToolsError::ImageError(format!(
                "Unsupported predictor {}",
                other
            ))),
        }
    }
}

fn undo_tiff(mut data: Vec<u8>, row_len: usize, bpp: usize) -> Result<Vec<u8>, PdfToolsError> {
    if data.len() % row_len != 0 {
        return Err(PdfToolsError::ImageError(format!(
            "{} bytes is not a whole number of {}-byte rows",
            data.len(),
            row_len
        )));
    }
    for row in data.chunks_exact_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(data)
}

/// Every row carries its own filter tag, whichever of 10..=15 was declared.
fn undo_png(data: &[u8], row_len: usize, bpp: usize) -> Result<Vec<u8>, PdfToolsError> {
    let stride = row_len + 1;
    if data.len() % stride != 0 {
        return Err(PdfToolsError::ImageError(format!(
            "{} bytes is not a whole number of {}-byte predicted rows",
            data.len(),
            stride
        )));
    }

    let mut out = vec![0u8; data.len() / stride * row_len];
    let mut prev = vec![0u8; row_len];

    for (encoded, row) in data.chunks_exact(stride).zip(out.chunks_exact_mut(row_len)) {
        let (tag, encoded) = (encoded[0], &encoded[1..]);
        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(PdfToolsError::ImageError(format!(
                        "Invalid PNG row filter {}",
                        other
                    )))
                }
            };
            row[i] = encoded[i].wrapping_add(predicted);
        }
        prev.copy_from_slice(row);
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let (pa, pb, pc) = ((p - a as i16).abs(), (p - b as i16).abs(), (p - c as i16).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Per-component `(min, max)` pairs of a `/Decode` array. `None` when the
/// array is absent or is the identity mapping `[0 1 ...]`.
pub(crate) fn decode_ranges(dict: &Dictionary, components: usize) -> Option<Vec<(f32, f32)>> {
    let items = dict.get(b"Decode").ok()?.as_array().ok()?;
    let numbers: Vec<f32> = items
        .iter()
        .filter_map(|obj| match obj {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r as f32),
            _ => None,
        })
        .collect();

    let ranges: Vec<(f32, f32)> = numbers
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .take(components)
        .collect();
    if ranges.iter().all(|&(min, max)| min == 0.0 && max == 1.0) {
        None
    } else {
        Some(ranges)
    }
}

/// Map 8-bit samples through `/Decode` ranges, so that `[1 0]` inverts.
pub(crate) fn apply_decode(samples: &mut [u8], ranges: &[(f32, f32)]) {
    if ranges.is_empty() {
        return;
    }
    for (i, sample) in samples.iter_mut().enumerate() {
        let (min, max) = ranges[i % ranges.len()];
        let value = min + (*sample as f32 / 255.0) * (max - min);
        *sample = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}
