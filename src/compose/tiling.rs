use crate::foundation::core::Padding;

/// Axis along which watermark copies are stacked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileAxis {
    /// Copies stacked top to bottom, each spanning the padded image width.
    Vertical,
    /// Copies stacked left to right, each spanning the padded image height.
    Horizontal,
}

/// Placement of the scaled watermark copies on one source image.
///
/// All coordinates are in source-image pixels. A layout with `repeats == 0` is valid and means
/// the source is left untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayout {
    pub axis: TileAxis,
    /// Scale factor applied to the watermark on both axes.
    pub ratio: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub repeats: u32,
    /// Start of the first copy along the tiled axis.
    pub offset: i64,
    /// Position of every copy on the cross axis.
    pub cross_offset: i64,
    pub gap: u32,
}

impl TileLayout {
    /// Decide scale, axis and copy count for a `source` (w, h) and `watermark` (w, h).
    pub fn plan(source: (u32, u32), watermark: (u32, u32), padding: Padding) -> Self {
        let (src_w, src_h) = (i64::from(source.0), i64::from(source.1));
        let (wm_w, wm_h) = (i64::from(watermark.0), i64::from(watermark.1));
        let around = i64::from(padding.around);
        let between = i64::from(padding.between);

        if wm_w == 0 || wm_h == 0 {
            return Self::empty(TileAxis::Vertical, padding.between);
        }

        let mut axis = TileAxis::Vertical;
        let mut scaled_w = src_w - 2 * around;
        let mut ratio = scaled_w as f64 / wm_w as f64;
        let mut scaled_h = (wm_h as f64 * ratio).round() as i64;

        if scaled_h + 2 * around > src_h {
            axis = TileAxis::Horizontal;
            scaled_h = src_h - 2 * around;
            ratio = scaled_h as f64 / wm_h as f64;
            scaled_w = (wm_w as f64 * ratio).round() as i64;
        }

        if scaled_w < 1 || scaled_h < 1 {
            return Self::empty(axis, padding.between);
        }

        let (dim, avail, cross_dim, cross_avail) = match axis {
            TileAxis::Vertical => (scaled_h, src_h, scaled_w, src_w),
            TileAxis::Horizontal => (scaled_w, src_w, scaled_h, src_h),
        };

        let room = avail - 2 * around + between;
        let repeats = if room <= 0 { 0 } else { room / (dim + between) };
        if repeats == 0 {
            return Self::empty(axis, padding.between);
        }

        let span = repeats * (dim + between) - between;
        let (Ok(scaled_width), Ok(scaled_height), Ok(repeats)) = (
            u32::try_from(scaled_w),
            u32::try_from(scaled_h),
            u32::try_from(repeats),
        ) else {
            return Self::empty(axis, padding.between);
        };

        Self {
            axis,
            ratio,
            scaled_width,
            scaled_height,
            repeats,
            offset: (avail - span).div_euclid(2),
            cross_offset: (cross_avail - cross_dim).div_euclid(2),
            gap: padding.between,
        }
    }

    fn empty(axis: TileAxis, gap: u32) -> Self {
        Self {
            axis,
            ratio: 0.0,
            scaled_width: 0,
            scaled_height: 0,
            repeats: 0,
            offset: 0,
            cross_offset: 0,
            gap,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repeats == 0
    }

    /// Size of one copy along the tiled axis.
    pub fn tile_len(&self) -> u32 {
        match self.axis {
            TileAxis::Vertical => self.scaled_height,
            TileAxis::Horizontal => self.scaled_width,
        }
    }

    /// Top-left corner of each copy, in paste order.
    pub fn positions(&self) -> Vec<(i64, i64)> {
        let step = i64::from(self.tile_len()) + i64::from(self.gap);
        (0..i64::from(self.repeats))
            .map(|i| {
                let along = self.offset + i * step;
                match self.axis {
                    TileAxis::Vertical => (self.cross_offset, along),
                    TileAxis::Horizontal => (along, self.cross_offset),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/tiling.rs"]
mod tests;
