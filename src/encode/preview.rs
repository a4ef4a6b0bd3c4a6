use std::borrow::Cow;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};

use crate::assets::decode::{format_for, load_image, load_watermark};
use crate::compose::place_watermark;
use crate::foundation::core::WatermarkSpec;
use crate::foundation::error::WatermarkResult;

/// Encoded bytes of the most recently marked image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewFrame {
    /// Source image this frame was rendered from.
    pub source: PathBuf,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl PreviewFrame {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URI suitable for embedding straight into a UI payload.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.to_mime_type(), self.to_base64())
    }
}

/// Re-encode `image` in `format` into an in-memory byte string.
pub fn encode_preview(image: &DynamicImage, format: ImageFormat) -> WatermarkResult<Vec<u8>> {
    let mut buf = Vec::new();
    encodable(image, format)
        .write_to(&mut Cursor::new(&mut buf), format)
        .with_context(|| format!("encode preview as {format:?}"))?;
    Ok(buf)
}

/// Mark `source` once without touching the disk.
///
/// Returns `None` when no watermark is configured. Processing errors are logged and also
/// reported as `None`.
pub fn render_single_preview(
    source: &Path,
    watermark: Option<&WatermarkSpec>,
) -> Option<PreviewFrame> {
    let spec = watermark?;
    match try_render_preview(source, spec) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::error!(
                image = %source.display(),
                watermark = %spec.path.display(),
                padding_around = spec.padding.around,
                padding_between = spec.padding.between,
                error = %err,
                "failed to render watermark preview"
            );
            None
        }
    }
}

fn try_render_preview(source: &Path, spec: &WatermarkSpec) -> WatermarkResult<PreviewFrame> {
    let format = format_for(source)?;
    let image = load_image(source)?;
    let watermark = load_watermark(&spec.path)?;
    let marked = place_watermark(&image, &watermark, spec.padding);
    Ok(PreviewFrame {
        source: source.to_path_buf(),
        format,
        bytes: encode_preview(&marked, format)?,
    })
}

/// JPEG cannot carry alpha; flatten to RGB before handing it to that encoder.
pub(crate) fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    if format == ImageFormat::Jpeg && image.color().has_alpha() {
        Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
    } else {
        Cow::Borrowed(image)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/preview.rs"]
mod tests;
