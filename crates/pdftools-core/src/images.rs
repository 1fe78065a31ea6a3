//! Embedded image extraction
//!
//! Walks each page's `/Resources /XObject` dictionary, descending into form
//! XObjects, and writes out every image stream it can express as a file:
//! JPEG streams as-is, raw or Flate-compressed 8-bit samples as PNG.

use crate::decode::{apply_decode, decode_ranges, inflate, sample_len, Predictor};
use crate::document::{self, inherited_attribute};
use crate::error::PdfToolsError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Form XObjects nested deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageExtractOptions {
    /// File name stem, usually the input PDF's stem
    pub base_name: String,
}

impl Default for ImageExtractOptions {
    fn default() -> Self {
        Self {
            base_name: "document".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImage {
    pub page_number: u32,
    /// Position among the images of its page, starting at 1
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub file_name: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Extract every supported image, in page order.
pub fn extract_images(
    bytes: &[u8],
    options: &ImageExtractOptions,
) -> Result<Vec<ExtractedImage>, PdfToolsError> {
    let doc = document::load(bytes)?;
    let mut images = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let mut image_ids = Vec::new();
        let mut visited = HashSet::new();
        if let Some(resources) = inherited_attribute(&doc, page_id, b"Resources")
            .and_then(|obj| resolve_dict(&doc, obj))
        {
            collect_images(&doc, resources, &mut visited, &mut image_ids, 0);
        }

        let mut index = 0;
        for image_id in image_ids {
            let Ok(stream) = doc.get_object(image_id).and_then(Object::as_stream) else {
                continue;
            };
            let Some((format, width, height, data)) = encode_image(&doc, stream)? else {
                continue;
            };

            index += 1;
            let file_name = if index == 1 {
                format!("{}_p{:03}.{}", options.base_name, page_number, format.extension())
            } else {
                format!(
                    "{}_p{:03}_{}.{}",
                    options.base_name,
                    page_number,
                    index,
                    format.extension()
                )
            };
            images.push(ExtractedImage {
                page_number,
                index,
                width,
                height,
                format,
                file_name,
                data,
            });
        }
    }

    info!("Extracted {} images", images.len());
    Ok(images)
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Image XObject ids reachable from a resource dictionary, in dictionary order.
fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<ObjectId>,
    depth: usize,
) {
    if depth > MAX_FORM_DEPTH {
        return;
    }
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return;
    };

    for (_, value) in xobjects.iter() {
        let Ok(id) = value.as_reference() else {
            continue;
        };
        if !visited.insert(id) {
            continue;
        }
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => out.push(id),
            Ok(b"Form") => {
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|obj| resolve_dict(doc, obj))
                {
                    collect_images(doc, form_resources, visited, out, depth + 1);
                }
            }
            _ => {}
        }
    }
}

/// Filter names of a stream, outermost first.
fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| f.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&n| n > 0)
}

/// Components per sample for the color spaces PNG output supports.
fn color_components(doc: &Document, dict: &Dictionary) -> Option<usize> {
    let space = match dict.get(b"ColorSpace").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };

    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        // [/ICCBased <stream>] carries the component count as /N
        Object::Array(items)
            if items.first().and_then(|o| o.as_name().ok()) == Some(&b"ICCBased"[..]) =>
        {
            let profile = match items.get(1)? {
                Object::Reference(id) => doc.get_object(*id).ok()?.as_stream().ok()?,
                _ => return None,
            };
            match profile.dict.get(b"N").and_then(Object::as_i64).ok()? {
                1 => Some(1),
                3 => Some(3),
                4 => Some(4),
                _ => None,
            }
        }
        _ => None,
    }
}

type EncodedImage = (ImageFormat, u32, u32, Vec<u8>);

fn encode_image(doc: &Document, stream: &Stream) -> Result<Option<EncodedImage>, PdfToolsError> {
    let (Some(width), Some(height)) = (
        dimension(&stream.dict, b"Width"),
        dimension(&stream.dict, b"Height"),
    ) else {
        debug!("Skipping image without dimensions");
        return Ok(None);
    };

    let filters = stream_filters(stream);
    match filters.as_slice() {
        [dct] if dct.as_slice() == b"DCTDecode" => {
            Ok(Some((ImageFormat::Jpeg, width, height, stream.content.clone())))
        }
        [] | [_] if filters.iter().all(|f| f.as_slice() == b"FlateDecode") => {
            encode_raw_samples(doc, stream, width, height)
        }
        _ => {
            debug!(
                "Skipping image with unsupported filters {:?}",
                filters
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
            );
            Ok(None)
        }
    }
}

fn encode_raw_samples(
    doc: &Document,
    stream: &Stream,
    width: u32,
    height: u32,
) -> Result<Option<EncodedImage>, PdfToolsError> {
    let Some((samples, components)) = raw_samples(doc, stream, width, height) else {
        return Ok(None);
    };

    encode_png(&samples, width, height, components).map(|png| {
        png.map(|data| (ImageFormat::Png, width, height, data))
    })
}

/// Exactly `width × height × components` 8-bit samples, for unfiltered or
/// Flate-compressed images in a gray, RGB or CMYK color space. A `/Decode`
/// array is already applied.
fn raw_samples(
    doc: &Document,
    stream: &Stream,
    width: u32,
    height: u32,
) -> Option<(Vec<u8>, usize)> {
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 || stream.dict.has(b"ImageMask") {
        debug!("Skipping {}-bit image", bits);
        return None;
    }

    let Some(components) = color_components(doc, &stream.dict) else {
        debug!("Skipping image with unsupported color space");
        return None;
    };
    let Some(expected) = sample_len(width, height, components) else {
        debug!("Skipping {}x{} image, too large to decode", width, height);
        return None;
    };

    let mut samples = if stream_filters(stream).is_empty() {
        stream.content.clone()
    } else {
        let predictor = Predictor::from_stream_dict(doc, &stream.dict);
        match inflate(&stream.content).and_then(|data| predictor.apply(data)) {
            Ok(data) => data,
            Err(e) => {
                debug!("Could not decode image data: {}", e);
                return None;
            }
        }
    };

    if samples.len() < expected {
        debug!(
            "Image data too short: {} bytes for {}x{}x{}",
            samples.len(),
            width,
            height,
            components
        );
        return None;
    }
    samples.truncate(expected);

    if let Some(ranges) = decode_ranges(&stream.dict, components) {
        apply_decode(&mut samples, &ranges);
    }
    Some((samples, components))
}

/// Decode an image XObject into pixels, if its encoding is understood.
///
/// JPEGs with a non-default `/Decode` array are refused, since the decoder
/// cannot apply it.
pub(crate) fn decode_image(doc: &Document, stream: &Stream) -> Option<image::DynamicImage> {
    let width = dimension(&stream.dict, b"Width")?;
    let height = dimension(&stream.dict, b"Height")?;

    let filters = stream_filters(stream);
    match filters.as_slice() {
        [dct] if dct.as_slice() == b"DCTDecode" => {
            if decode_ranges(&stream.dict, usize::MAX).is_some() {
                return None;
            }
            image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok()
        }
        [] | [_] if filters.iter().all(|f| f.as_slice() == b"FlateDecode") => {
            let (samples, components) = raw_samples(doc, stream, width, height)?;
            match components {
                1 => image::GrayImage::from_raw(width, height, samples)
                    .map(image::DynamicImage::ImageLuma8),
                3 => image::RgbImage::from_raw(width, height, samples)
                    .map(image::DynamicImage::ImageRgb8),
                4 => image::RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
                    .map(image::DynamicImage::ImageRgb8),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Encode exactly-sized 8-bit samples as PNG. CMYK is converted to RGB first.
fn encode_png(
    samples: &[u8],
    width: u32,
    height: u32,
    components: usize,
) -> Result<Option<Vec<u8>>, PdfToolsError> {
    let (color, data) = match components {
        1 => (png::ColorType::Grayscale, samples.to_vec()),
        3 => (png::ColorType::Rgb, samples.to_vec()),
        4 => (png::ColorType::Rgb, cmyk_to_rgb(samples)),
        _ => return Ok(None),
    };

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| PdfToolsError::ImageError(e.to_string()))?;
        writer
            .write_image_data(&data)
            .map_err(|e| PdfToolsError::ImageError(e.to_string()))?;
    }
    Ok(Some(out))
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u16;
            [0, 1, 2].map(|i| ((255 - px[i] as u16) * k / 255) as u8)
        })
        .collect()
}
