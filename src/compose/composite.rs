use image::{DynamicImage, RgbaImage, imageops, imageops::FilterType};

use crate::compose::tiling::TileLayout;
use crate::foundation::core::Padding;

/// Stamp tiled copies of `watermark` onto a copy of `source`.
///
/// The watermark is resampled with Lanczos3 and pasted through its own alpha channel. The
/// result keeps the source's dimensions and color type; a layout with zero repeats returns an
/// unmodified clone.
pub fn place_watermark(
    source: &DynamicImage,
    watermark: &RgbaImage,
    padding: Padding,
) -> DynamicImage {
    let layout = TileLayout::plan(
        (source.width(), source.height()),
        watermark.dimensions(),
        padding,
    );
    if layout.is_empty() {
        return source.clone();
    }

    let tile = imageops::resize(
        watermark,
        layout.scaled_width,
        layout.scaled_height,
        FilterType::Lanczos3,
    );

    let mut canvas = source.to_rgba8();
    for (x, y) in layout.positions() {
        imageops::overlay(&mut canvas, &tile, x, y);
    }

    match_color_type(source, canvas)
}

fn match_color_type(source: &DynamicImage, canvas: RgbaImage) -> DynamicImage {
    let marked = DynamicImage::ImageRgba8(canvas);
    match source {
        DynamicImage::ImageRgba8(_) => marked,
        DynamicImage::ImageRgb8(_) => DynamicImage::ImageRgb8(marked.to_rgb8()),
        DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(marked.to_luma8()),
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLumaA8(marked.to_luma_alpha8()),
        other if other.color().has_alpha() => marked,
        _ => DynamicImage::ImageRgb8(marked.to_rgb8()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/composite.rs"]
mod tests;
