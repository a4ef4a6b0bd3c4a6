use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::foundation::error::{WatermarkError, WatermarkResult};

pub fn load_image(path: &Path) -> WatermarkResult<DynamicImage> {
    let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(img)
}

/// Decode the watermark once into straight-alpha RGBA8, ready for pasting.
pub fn load_watermark(path: &Path) -> WatermarkResult<RgbaImage> {
    let img = load_image(path)?;
    let rgba = img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(WatermarkError::configuration(format!(
            "watermark '{}' has no pixels",
            path.display()
        )));
    }
    Ok(rgba)
}

/// Encoding format for an image, taken from its file extension.
pub fn format_for(path: &Path) -> WatermarkResult<ImageFormat> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("unsupported image extension '{}'", path.display()))?;
    Ok(format)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
