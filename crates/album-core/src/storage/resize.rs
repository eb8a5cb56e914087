//! Client-side image downsizing before upload.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use image::metadata::Orientation;
use image::{
    codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView, ImageDecoder,
    ImageReader,
};
use serde::{Deserialize, Serialize};

use crate::models::PendingUpload;
use crate::{Error, Result};

/// Re-encode format for uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    const fn as_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(Self::Jpeg),
            "png" | "image/png" => Ok(Self::Png),
            "webp" | "image/webp" => Ok(Self::WebP),
            other => Err(Error::InvalidInput(format!(
                "Unsupported output format: {other}"
            ))),
        }
    }
}

/// Parameters for [`resize_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOptions {
    /// Longest allowed edge in pixels.
    pub max_dimension: u32,
    /// Output image format.
    pub format: OutputFormat,
    /// Encoder quality in `0.0..=1.0`. Only JPEG is lossy; PNG and WebP
    /// encoders ignore it.
    pub quality: f32,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1920,
            format: OutputFormat::Jpeg,
            quality: 0.8,
        }
    }
}

impl ResizeOptions {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 1..=100
    fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
    }
}

/// Re-encoded image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Payload ready for the store, either resized or the untouched original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Extension matching `bytes`, without the dot.
    pub extension: String,
    pub resized: bool,
}

/// Target size that fits within `max_dimension` on both axes.
///
/// Never upsizes. Aspect ratio is kept within rounding and neither side drops
/// below one pixel.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let max = u64::from(max_dimension.max(1));
    let (width, height) = (u64::from(width), u64::from(height));
    let (long, short) = if width >= height {
        (width, height)
    } else {
        (height, width)
    };
    let short = ((short * max + long / 2) / long).clamp(1, max);

    #[allow(clippy::cast_possible_truncation)] // <= max_dimension
    let (max, short) = (max as u32, short as u32);
    if width >= height {
        (max, short)
    } else {
        (short, max)
    }
}

/// Decode, downsize and re-encode an image.
pub fn resize_image(source_bytes: &[u8], options: ResizeOptions) -> Result<ResizedImage> {
    if source_bytes.is_empty() {
        return Err(Error::Decode("source image is empty".to_string()));
    }
    if options.max_dimension == 0 {
        return Err(Error::InvalidInput(
            "Resize max dimension must be greater than zero".to_string(),
        ));
    }

    let source = decode_upright(source_bytes)
        .map_err(|error| Error::Decode(format!("failed to decode source image: {error}")))?;

    let (source_width, source_height) = source.dimensions();
    let (width, height) = fit_within(source_width, source_height, options.max_dimension);
    let resized = if (width, height) == (source_width, source_height) {
        source
    } else {
        source.resize_exact(width, height, FilterType::Triangle)
    };

    let bytes = encode_image(&resized, options)?;

    Ok(ResizedImage {
        bytes,
        width,
        height,
        format: options.format,
    })
}

/// Decode with the EXIF orientation applied; the re-encoded output has no
/// EXIF block.
fn decode_upright(source_bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(source_bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn encode_image(image: &DynamicImage, options: ResizeOptions) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());

    match options.format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let mut encoder = JpegEncoder::new_with_quality(&mut cursor, options.jpeg_quality());
            encoder
                .encode_image(&rgb)
                .map_err(|error| Error::Decode(format!("failed to encode JPEG: {error}")))?;
        }
        OutputFormat::Png | OutputFormat::WebP => {
            image
                .write_to(&mut cursor, options.format.as_image_format())
                .map_err(|error| {
                    Error::Decode(format!("failed to encode {} image: {error}", options.format))
                })?;
        }
    }

    Ok(cursor.into_inner())
}

/// Resize a pending upload on the blocking pool, falling back to the original
/// bytes when the image cannot be decoded or encoded.
pub async fn resize_or_original(upload: &PendingUpload, options: ResizeOptions) -> PreparedPayload {
    let source = Arc::clone(&upload.payload);
    let worker_source = Arc::clone(&source);
    let outcome =
        tokio::task::spawn_blocking(move || resize_image(&worker_source, options)).await;

    match outcome {
        Ok(Ok(resized)) => {
            tracing::debug!(
                "Resized {} to {}x{} ({} bytes)",
                upload.file_name,
                resized.width,
                resized.height,
                resized.bytes.len()
            );
            PreparedPayload {
                bytes: resized.bytes,
                content_type: resized.format.mime_type().to_string(),
                extension: resized.format.extension().to_string(),
                resized: true,
            }
        }
        Ok(Err(error)) => {
            tracing::warn!("Uploading {} unmodified: {}", upload.file_name, error);
            original_payload(upload, &source)
        }
        Err(error) => {
            tracing::warn!(
                "Resize worker for {} did not finish: {}",
                upload.file_name,
                error
            );
            original_payload(upload, &source)
        }
    }
}

fn original_payload(upload: &PendingUpload, source: &[u8]) -> PreparedPayload {
    PreparedPayload {
        bytes: source.to_vec(),
        content_type: upload.content_type.clone(),
        extension: upload.extension(),
        resized: false,
    }
}
