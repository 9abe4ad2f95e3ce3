//! Pure Rust effect backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Grayscale | `DynamicImage::to_luma8` (Rec. 709 luma) |
//! | Negative | `DynamicImage::invert` (`255 - v` per colour channel) |
//! | Sepia | per-pixel [`sepia_pixel`](super::calculations::sepia_pixel) matrix |
//! | Thumbnail | [`fit_within`](super::calculations::fit_within) + `resize_exact` (Lanczos3) |
//! | Encode | `JpegEncoder` / PNG, chosen by output extension |
//! | Write | temp file in the output directory, then atomic rename |

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::calculations::{fit_within, sepia_pixel};
use super::params::{BoundingBox, Effect, EffectParams, Quality};
use crate::layout::write_atomic;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Apply an effect to a decoded image.
///
/// Pure: the input is never modified, and the same input always yields the
/// same output.
pub fn render_effect(img: &DynamicImage, effect: Effect, bounds: BoundingBox) -> DynamicImage {
    match effect {
        Effect::None => img.clone(),
        Effect::Grayscale => DynamicImage::ImageLuma8(img.to_luma8()),
        Effect::Negative => {
            let mut out = img.clone();
            out.invert();
            out
        }
        Effect::Sepia => {
            let mut rgb = img.to_rgb8();
            for pixel in rgb.pixels_mut() {
                pixel.0 = sepia_pixel(pixel.0);
            }
            DynamicImage::ImageRgb8(rgb)
        }
        Effect::Thumbnail => {
            let source = (img.width(), img.height());
            let (w, h) = fit_within(source, (bounds.width, bounds.height));
            if (w, h) == source {
                img.clone()
            } else {
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
        }
    }
}

fn output_format(path: &Path) -> Result<ImageFormat, BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        other => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            other
        ))),
    }
}

/// Encode to an in-memory buffer.
///
/// JPEG has no alpha channel, so anything that is not already L8 or RGB8 is
/// flattened to one of those first.
fn encode(img: &DynamicImage, format: ImageFormat, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let flat = match img {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img.clone(),
                other if other.color().has_color() => DynamicImage::ImageRgb8(other.to_rgb8()),
                other => DynamicImage::ImageLuma8(other.to_luma8()),
            };
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            flat.write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
        }
        other => {
            img.write_to(&mut Cursor::new(&mut buf), other)
                .map_err(|e| BackendError::ProcessingFailed(format!("Encode failed: {}", e)))?;
        }
    }
    Ok(buf)
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

fn color_name(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "L;16".to_string(),
        ColorType::La16 => "LA;16".to_string(),
        ColorType::Rgb16 => "RGB;16".to_string(),
        ColorType::Rgba16 => "RGBA;16".to_string(),
        other => format!("{other:?}"),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Unknown image format: {}", path.display()))
        })?;
        let decoder = reader.into_decoder().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let (width, height) = decoder.dimensions();
        Ok(ImageInfo {
            width,
            height,
            format: format_name(format),
            color: color_name(decoder.color_type()),
        })
    }

    fn apply(&self, params: &EffectParams) -> Result<(), BackendError> {
        let format = output_format(&params.output)?;
        let img = load_image(&params.source)?;
        let rendered = render_effect(&img, params.effect, params.thumbnail_box);
        let bytes = encode(&rendered, format, params.quality)?;
        write_atomic(&params.output, &bytes)?;
        Ok(())
    }

    fn import(
        &self,
        data: &[u8],
        output: &Path,
        quality: Quality,
    ) -> Result<ImageInfo, BackendError> {
        let img = image::load_from_memory(data)
            .map_err(|e| BackendError::ProcessingFailed(format!("Not a decodable image: {}", e)))?;
        let bytes = encode(&img, ImageFormat::Jpeg, quality)?;
        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir)?;
        }
        write_atomic(output, &bytes)?;
        let color = if img.color().has_color() {
            ColorType::Rgb8
        } else {
            ColorType::L8
        };
        Ok(ImageInfo {
            width: img.width(),
            height: img.height(),
            format: format_name(ImageFormat::Jpeg),
            color: color_name(color),
        })
    }
}
