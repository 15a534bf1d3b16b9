//! Image compression - optional downscale by width, JPEG re-encode at quality

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use serde::Serialize;
use serde_json::json;

use crate::data_url;
use crate::logic::LogicError;
use crate::{BoxFuture, Inputs, Logic, Outputs};

const OUTPUT_MIME: &str = "image/jpeg";
const DEFAULT_QUALITY: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionInfo {
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: i64,
    pub original_dimensions: Dimensions,
    pub compressed_dimensions: Dimensions,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct Compressed {
    pub data_url: String,
    pub info: CompressionInfo,
}

/// Percent saved, rounded half up
pub fn compression_ratio(original_size: usize, compressed_size: usize) -> i64 {
    if original_size == 0 {
        return 0;
    }
    let saved = (1.0 - compressed_size as f64 / original_size as f64) * 100.0;
    (saved + 0.5).floor() as i64
}

/// Target size: width capped at `max_width`, height scaled to keep the aspect ratio
pub fn target_dimensions(width: u32, height: u32, max_width: Option<u32>) -> Dimensions {
    match max_width {
        Some(max) if max > 0 && width > max => {
            let scaled = (height as f64 * max as f64 / width as f64).round() as u32;
            Dimensions { width: max, height: scaled.max(1) }
        }
        _ => Dimensions { width, height },
    }
}

/// Decode, resize and re-encode. CPU bound; call from a blocking context.
pub fn compress(bytes: &[u8], quality: u8, max_width: Option<u32>) -> Result<Compressed, LogicError> {
    let img = image::load_from_memory(bytes).map_err(|e| LogicError::ImageLoad(e.to_string()))?;
    let (width, height) = img.dimensions();
    let target = target_dimensions(width, height, max_width);

    let resized = if target.width != width || target.height != height {
        img.resize_exact(target.width, target.height, FilterType::Triangle)
    } else {
        img
    };
    // JPEG carries no alpha channel
    let rgb = resized.to_rgb8();

    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100));
    encoder.encode_image(&rgb).map_err(|e| LogicError::Encode(e.to_string()))?;

    let info = CompressionInfo {
        original_size: bytes.len(),
        compressed_size: encoded.len(),
        compression_ratio: compression_ratio(bytes.len(), encoded.len()),
        original_dimensions: Dimensions { width, height },
        compressed_dimensions: Dimensions { width: rgb.width(), height: rgb.height() },
        format: OUTPUT_MIME.to_string(),
    };

    Ok(Compressed { data_url: data_url::encode(OUTPUT_MIME, &encoded), info })
}

pub struct CompressImage;

impl Logic for CompressImage {
    fn name(&self) -> &'static str { "compressImage" }

    fn description(&self) -> &'static str {
        "Downscale and re-encode an image as JPEG at a chosen quality"
    }

    fn run(&self, mut inputs: Inputs) -> BoxFuture<'_, Result<Outputs, LogicError>> {
        Box::pin(async move {
            let file = inputs
                .take_file("imageFile")
                .ok_or_else(|| LogicError::InvalidInput("imageFile is required".into()))?;
            let quality = inputs.number("quality").unwrap_or(DEFAULT_QUALITY).clamp(1.0, 100.0).round() as u8;
            let max_width = inputs
                .number("maxWidth")
                .filter(|w| *w >= 1.0)
                .map(|w| w.floor() as u32);

            tracing::debug!(file = %file.name, size = file.size(), quality, ?max_width, "Compressing image");

            let compressed = tokio::task::spawn_blocking(move || compress(&file.bytes, quality, max_width))
                .await
                .map_err(|e| LogicError::Other(format!("Compression task failed: {e}")))??;

            let mut outputs = Outputs::new();
            outputs.insert("compressedImage".into(), json!(compressed.data_url));
            outputs.insert("compressionInfo".into(), json!(compressed.info));
            Ok(outputs)
        })
    }
}
