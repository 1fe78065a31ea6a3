//! JPEG/PNG to single-page PDF

use crate::error::PdfToolsError;
use flate2::{write::ZlibEncoder, Compression};
use image::{ColorType, ImageFormat};
use lopdf::{content::Content, content::Operation, dictionary, Document, Object, Stream};
use std::io::Write;

/// Images are placed at this resolution, so 100 pixels span one inch.
const IMAGE_DPI: f64 = 100.0;

pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfToolsError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Place an image on a page of exactly its size at 100 DPI.
///
/// 8-bit RGB and grayscale JPEGs are embedded untouched. Everything else is
/// decoded, flattened to RGB (alpha dropped) and Flate-compressed.
pub fn image_to_pdf(bytes: &[u8]) -> Result<Vec<u8>, PdfToolsError> {
    image_to_pdf_at_dpi(bytes, IMAGE_DPI)
}

/// Same as [`image_to_pdf`], with `dpi` pixels per inch of page.
pub fn image_to_pdf_at_dpi(bytes: &[u8], dpi: f64) -> Result<Vec<u8>, PdfToolsError> {
    if !(dpi > 0.0) {
        return Err(PdfToolsError::InvalidRange(format!(
            "DPI must be positive, got {}",
            dpi
        )));
    }
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (img.width(), img.height());

    let (data, filter, color_space) = match (format, img.color()) {
        (ImageFormat::Jpeg, ColorType::Rgb8) => (bytes.to_vec(), "DCTDecode", "DeviceRGB"),
        (ImageFormat::Jpeg, ColorType::L8) => (bytes.to_vec(), "DCTDecode", "DeviceGray"),
        _ => (
            deflate(img.to_rgb8().as_raw())?,
            "FlateDecode",
            "DeviceRGB",
        ),
    };

    let page_width = width as f64 * 72.0 / dpi;
    let page_height = height as f64 * 72.0 / dpi;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => filter,
        },
        data,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (page_width as f32).into(),
                    0.into(),
                    0.into(),
                    (page_height as f32).into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    }
    .encode()
    .map_err(|e| PdfToolsError::ConversionError(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (page_width as f32).into(),
            (page_height as f32).into(),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}
