//! Size reduction by downsampling embedded images
//!
//! The level (0-100) controls both the resize factor and the JPEG quality.
//! Re-encoded images are only kept when they come out smaller, and every
//! level ends with a prune/compress pass.
//!
//! With the `render` feature, `rasterize_document` instead renders every
//! page to a JPEG at a level-dependent resolution and rebuilds the PDF from
//! those images.

use crate::document;
use crate::error::PdfToolsError;
use crate::images::decode_image;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use lopdf::{Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, info};

/// Images are never scaled below this fraction of their size...
const MIN_SCALE: f64 = 0.1;
/// ...or below this many pixels per side.
const MIN_SIDE: u32 = 16;
const MAX_JPEG_QUALITY: f64 = 95.0;
const MIN_JPEG_QUALITY: f64 = 25.0;
/// Page rasterization resolution at level 0, and its floor.
const MAX_RASTER_DPI: f64 = 150.0;
const MIN_RASTER_DPI: f64 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Compression level, 0 (lossless only) to 100 (smallest)
    pub level: u8,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self { level: 50 }
    }
}

impl OptimizeOptions {
    pub fn new(level: u8) -> Result<Self, PdfToolsError> {
        let options = Self { level };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), PdfToolsError> {
        if self.level > 100 {
            return Err(PdfToolsError::InvalidRange(format!(
                "Optimization level must be between 0 and 100, got {}",
                self.level
            )));
        }
        Ok(())
    }

    fn scale(&self) -> f64 {
        (1.0 - self.level as f64 / 100.0).max(MIN_SCALE)
    }

    fn jpeg_quality(&self) -> u8 {
        (MAX_JPEG_QUALITY - self.level as f64 * 0.7).max(MIN_JPEG_QUALITY) as u8
    }

    /// Resolution pages are rendered at when rasterizing.
    pub fn raster_dpi(&self) -> f32 {
        (MAX_RASTER_DPI * self.scale()).max(MIN_RASTER_DPI) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeReport {
    pub original_size: usize,
    pub optimized_size: usize,
    pub images_recompressed: usize,
    /// Pages replaced by a rendered image; zero unless rasterizing
    pub pages_rasterized: usize,
}

impl OptimizeReport {
    /// Fraction of the original size saved, negative if the file grew.
    pub fn savings(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.optimized_size as f64 / self.original_size as f64
    }
}

/// Expected output size in KiB for a level, as the size slider shows it.
pub fn estimate_optimized_size(original_len: u64, level: u8) -> f64 {
    let level = level.min(100) as f64;
    original_len as f64 * (1.0 - level / 100.0) / 1024.0
}

pub fn optimize_document(
    bytes: &[u8],
    options: &OptimizeOptions,
) -> Result<(Vec<u8>, OptimizeReport), PdfToolsError> {
    options.validate()?;
    let mut doc = document::load(bytes)?;

    let images_recompressed = if options.level > 0 {
        recompress_images(&mut doc, options)?
    } else {
        0
    };

    let data = document::save(&mut doc)?;
    let report = OptimizeReport {
        original_size: bytes.len(),
        optimized_size: data.len(),
        images_recompressed,
        pages_rasterized: 0,
    };

    info!(
        "Optimized at level {}: {} -> {} bytes, {} images recompressed",
        options.level, report.original_size, report.optimized_size, images_recompressed
    );
    Ok((data, report))
}

fn recompress_images(doc: &mut Document, options: &OptimizeOptions) -> Result<usize, PdfToolsError> {
    let shared: &Document = doc;
    let candidates: Vec<ObjectId> = shared
        .objects
        .iter()
        .filter_map(|(&id, obj)| match obj {
            Object::Stream(stream) if is_recompressible(shared, stream) => Some(id),
            _ => None,
        })
        .collect();

    let mut replacements = Vec::new();
    for id in candidates {
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };
        let Some(img) = decode_image(doc, stream) else {
            debug!("Leaving image {:?} untouched, cannot decode", id);
            continue;
        };

        let (jpeg, width, height, gray) = reencode(&img, options)?;
        if jpeg.len() >= stream.content.len() {
            debug!(
                "Keeping image {:?}, re-encoded size {} >= {}",
                id,
                jpeg.len(),
                stream.content.len()
            );
            continue;
        }
        replacements.push((id, jpeg, width, height, gray));
    }

    let count = replacements.len();
    for (id, jpeg, width, height, gray) in replacements {
        let stream = doc.get_object_mut(id).and_then(Object::as_stream_mut)?;
        let dict = &mut stream.dict;
        dict.set("Width", width as i64);
        dict.set("Height", height as i64);
        dict.set("ColorSpace", if gray { "DeviceGray" } else { "DeviceRGB" });
        dict.set("BitsPerComponent", 8);
        dict.set("Filter", "DCTDecode");
        dict.remove(b"DecodeParms");
        dict.remove(b"Decode");
        stream.set_content(jpeg);
    }

    Ok(count)
}

/// Image XObjects whose pixels can be replaced by a JPEG without changing
/// how they are drawn.
///
/// A matted soft mask and the image it belongs to must keep matching
/// dimensions, so neither is touched.
fn is_recompressible(doc: &Document, stream: &Stream) -> bool {
    let dict = &stream.dict;
    let matted_mask = match dict.get(b"SMask") {
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(Object::as_stream)
            .map_or(false, |mask| mask.dict.has(b"Matte")),
        _ => false,
    };

    matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image"))
        && !dict.has(b"ImageMask")
        && !dict.has(b"Mask")
        && !dict.has(b"Matte")
        && !matted_mask
}

/// Downscale and encode as JPEG. Returns the data, new size and whether
/// the result is grayscale.
fn reencode(
    img: &DynamicImage,
    options: &OptimizeOptions,
) -> Result<(Vec<u8>, u32, u32, bool), PdfToolsError> {
    let scale = options.scale();
    let target = |side: u32| ((side as f64 * scale).round() as u32).max(MIN_SIDE.min(side));
    let (width, height) = (target(img.width()), target(img.height()));

    let resized = if (width, height) == (img.width(), img.height()) {
        img.clone()
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    let gray = !resized.color().has_color();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, options.jpeg_quality());
    if gray {
        encoder.encode_image(&resized.to_luma8())?;
    } else {
        encoder.encode_image(&resized.to_rgb8())?;
    }

    Ok((out, width, height, gray))
}

/// Render every page and rebuild the document from the renders.
///
/// Text and vector content become pixels. Page sizes are kept, rotation is
/// baked into the image.
#[cfg(feature = "render")]
pub fn rasterize_document(
    bytes: &[u8],
    options: &OptimizeOptions,
) -> Result<(Vec<u8>, OptimizeReport), PdfToolsError> {
    options.validate()?;
    let dpi = options.raster_dpi();
    let renders = crate::render::render_pages(bytes, dpi, &Default::default())?;

    let mut pages = Vec::with_capacity(renders.len());
    for render in &renders {
        let img = image::load_from_memory_with_format(&render.data, image::ImageFormat::Png)?;
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, options.jpeg_quality())
            .encode_image(&img.to_rgb8())?;
        pages.push(crate::convert::image_to_pdf_at_dpi(&jpeg, dpi as f64)?);
    }

    let data = crate::merge::merge_documents(pages)?;
    let report = OptimizeReport {
        original_size: bytes.len(),
        optimized_size: data.len(),
        images_recompressed: 0,
        pages_rasterized: renders.len(),
    };

    info!(
        "Rasterized {} pages at {} DPI: {} -> {} bytes",
        report.pages_rasterized, dpi, report.original_size, report.optimized_size
    );
    Ok((data, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{deflate, image_to_pdf};
    use crate::fixtures::create_test_pdf;
    use lopdf::{dictionary, Dictionary};
    use std::io::Cursor;

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    /// PDF holding one incompressible 256x256 noise image.
    fn noisy_image_pdf() -> Vec<u8> {
        let img = image::RgbImage::from_raw(256, 256, noise(256 * 256 * 3)).unwrap();
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        image_to_pdf(&png.into_inner()).unwrap()
    }

    /// One page drawing nothing, with the given image XObjects as resources.
    fn pdf_with_images(images: Vec<Stream>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut xobjects = Dictionary::new();
        for (i, img) in images.into_iter().enumerate() {
            let id = doc.add_object(img);
            xobjects.set(format!("Im{}", i), id);
        }
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn gray_image(side: i64, samples: &[u8]) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => side,
                "Height" => side,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(samples).unwrap(),
        )
    }

    fn image_sizes(pdf: &[u8]) -> Vec<(i64, i64)> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|s| is_recompressible(&doc, s))
            .map(|s| {
                (
                    s.dict.get(b"Width").unwrap().as_i64().unwrap(),
                    s.dict.get(b"Height").unwrap().as_i64().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_quality_and_scale_follow_level() {
        let low = OptimizeOptions::new(0).unwrap();
        assert_eq!(low.jpeg_quality(), 95);
        assert_eq!(low.scale(), 1.0);

        let high = OptimizeOptions::new(100).unwrap();
        assert_eq!(high.jpeg_quality(), 25);
        assert_eq!(high.scale(), MIN_SCALE);

        assert_eq!(OptimizeOptions::new(50).unwrap().jpeg_quality(), 60);
    }

    #[test]
    fn test_level_above_100_rejected() {
        assert!(matches!(
            OptimizeOptions::new(101),
            Err(PdfToolsError::InvalidRange(_))
        ));
        let options = OptimizeOptions { level: 150 };
        assert!(optimize_document(&create_test_pdf(1, "X"), &options).is_err());
    }

    #[test]
    fn test_estimate() {
        assert_eq!(estimate_optimized_size(10 * 1024, 0), 10.0);
        assert_eq!(estimate_optimized_size(10 * 1024, 50), 5.0);
        assert_eq!(estimate_optimized_size(10 * 1024, 100), 0.0);
    }

    #[test]
    fn test_downsamples_large_image() {
        let pdf = noisy_image_pdf();
        let (out, report) = optimize_document(&pdf, &OptimizeOptions::new(50).unwrap()).unwrap();

        assert_eq!(report.images_recompressed, 1);
        assert!(report.optimized_size < report.original_size);
        assert!(report.savings() > 0.5);
        assert_eq!(image_sizes(&out), vec![(128, 128)]);
        assert_eq!(crate::get_page_count(&out).unwrap(), 1);
    }

    #[test]
    fn test_min_side_clamp() {
        let pdf = noisy_image_pdf();
        let (out, _) = optimize_document(&pdf, &OptimizeOptions::new(100).unwrap()).unwrap();
        // 10% of 256 rounds to 26, above the 16px floor
        assert_eq!(image_sizes(&out), vec![(26, 26)]);
    }

    #[test]
    fn test_level_zero_is_lossless() {
        let pdf = noisy_image_pdf();
        let (out, report) = optimize_document(&pdf, &OptimizeOptions::new(0).unwrap()).unwrap();
        assert_eq!(report.images_recompressed, 0);
        assert_eq!(image_sizes(&out), vec![(256, 256)]);
    }

    #[test]
    fn test_text_only_pdf_keeps_pages() {
        let pdf = create_test_pdf(3, "Opt");
        let (out, report) = optimize_document(&pdf, &OptimizeOptions::default()).unwrap();
        assert_eq!(report.images_recompressed, 0);
        assert_eq!(crate::get_page_count(&out).unwrap(), 3);
    }

    #[test]
    fn test_raster_dpi_follows_level() {
        assert_eq!(OptimizeOptions::new(0).unwrap().raster_dpi(), 150.0);
        assert_eq!(OptimizeOptions::new(50).unwrap().raster_dpi(), 75.0);
        assert_eq!(OptimizeOptions::new(100).unwrap().raster_dpi(), 36.0);
    }

    #[test]
    fn test_inverted_decode_keeps_appearance() {
        // Dark samples drawn through [1 0] appear light
        let samples: Vec<u8> = noise(128 * 128).into_iter().map(|v| v / 4).collect();
        let mut image = gray_image(128, &samples);
        image.dict.set("Decode", vec![1.into(), 0.into()]);

        let pdf = pdf_with_images(vec![image]);
        let (out, report) = optimize_document(&pdf, &OptimizeOptions::new(50).unwrap()).unwrap();
        assert_eq!(report.images_recompressed, 1);

        let doc = Document::load_mem(&out).unwrap();
        let stream = doc
            .objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .find(|s| is_recompressible(&doc, s))
            .unwrap();
        assert!(!stream.dict.has(b"Decode"));

        let pixels = decode_image(&doc, stream).unwrap().to_luma8();
        let mean = pixels.pixels().map(|p| p.0[0] as u64).sum::<u64>() / pixels.pixels().len() as u64;
        assert!(mean > 200, "image came out dark, mean {}", mean);
    }

    #[test]
    fn test_matted_soft_mask_pair_is_untouched() {
        let mut mask = gray_image(128, &noise(128 * 128));
        mask.dict.set("Matte", vec![0.into()]);
        let pdf = {
            let mut doc = Document::load_mem(&pdf_with_images(vec![])).unwrap();
            let mask_id = doc.add_object(mask);
            let mut image = gray_image(128, &noise(128 * 128));
            image.dict.set("SMask", mask_id);
            let image_id = doc.add_object(image);

            let page_id = *doc.get_pages().values().next().unwrap();
            let page = doc.get_dictionary_mut(page_id).unwrap();
            page.set(
                "Resources",
                dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
            );
            let mut out = Vec::new();
            doc.save_to(&mut out).unwrap();
            out
        };

        let (out, report) = optimize_document(&pdf, &OptimizeOptions::new(50).unwrap()).unwrap();
        assert_eq!(report.images_recompressed, 0);

        let doc = Document::load_mem(&out).unwrap();
        let sides: Vec<i64> = doc
            .objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter_map(|s| s.dict.get(b"Width").and_then(Object::as_i64).ok())
            .collect();
        assert_eq!(sides, vec![128, 128]);
    }
}
