//! Shelf packing of glyph footprints into a square atlas.
//!
//! Glyphs are placed left to right along a row, each followed by a 1-texel
//! gutter so linear filtering never bleeds between neighbors. When a glyph
//! does not fit the remaining width a new row opens below the tallest glyph of
//! the current one:
//!
//! ```text
//! (0,0)
//!   ┌───────────────────────────────┐
//!   │ ┌──┐ ┌────┐ ┌──┐ ┌───┐        │  row 0, height = tallest
//!   │ │A │ │ B  │ │C │ │ D │        │
//!   │ └──┘ │    │ └──┘ └───┘        │
//!   │      └────┘                   │
//!   │ ┌───┐ ┌──┐ ...                │  row 1
//!   │ │ E │ │F │                    │
//!   └───────────────────────────────┘ texture_size
//! ```
//!
//! No reflow, no best-fit search. Glyphs are generated once at load time so
//! the greedy layout is good enough, but the packer refuses to place anything
//! past the bottom edge rather than wrapping onto existing rows.

use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use tracing::trace;

use crate::outline::GlyphMetrics;

/// Texels between neighboring footprints and around the atlas border.
pub const GUTTER: f32 = 1.0;

/// Padded rectangle a glyph's distance field occupies, in atlas texels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub width: f32,
    pub height: f32,
}

impl Footprint {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// `(glyph + range) * scale` on both axes: the outline plus half the
    /// falloff band on every side.
    pub fn for_glyph(metrics: &GlyphMetrics, range: f32, scale: f32) -> Self {
        Self {
            width: (metrics.width + range) * scale,
            height: (metrics.height + range) * scale,
        }
    }
}

/// Where the packer put a footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    /// This placement opened a new row.
    pub wrapped: bool,
}

/// Why a footprint could not be placed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PackError {
    /// Larger than the atlas on some axis; no amount of free space helps.
    TooLarge,
    /// The rows below the cursor are exhausted.
    Full,
}

/// Greedy shelf packer with an explicit capacity guard.
///
/// Cheap to clone, which is how a generation batch packs tentatively and
/// only commits once every glyph fits.
#[derive(Clone, Debug)]
pub struct ShelfPacker {
    texture_size: f32,
    offset_x: f32,
    offset_y: f32,
    row_height: f32,
    rows: u32,
    placed: u32,
    used_area: f32,
}

impl ShelfPacker {
    pub fn new(texture_size: u32) -> Self {
        Self {
            texture_size: texture_size as f32,
            offset_x: GUTTER,
            offset_y: GUTTER,
            row_height: 0.0,
            rows: 0,
            placed: 0,
            used_area: 0.0,
        }
    }

    /// Place the next footprint, or leave the packer untouched and report why
    /// it cannot go in.
    pub fn place(&mut self, footprint: Footprint) -> Result<Placement, PackError> {
        let size = self.texture_size;
        if footprint.width + GUTTER > size || footprint.height + GUTTER > size {
            return Err(PackError::TooLarge);
        }

        let mut x = self.offset_x;
        let mut y = self.offset_y;
        let mut row_height = self.row_height;
        let wrapped = x + footprint.width > size;
        if wrapped {
            y += row_height + GUTTER;
            x = GUTTER;
            row_height = 0.0;
        }
        if y + footprint.height > size {
            return Err(PackError::Full);
        }

        self.offset_x = x + footprint.width + GUTTER;
        self.offset_y = y;
        self.row_height = row_height.max(footprint.height);
        if wrapped || self.placed == 0 {
            self.rows += 1;
        }
        self.placed += 1;
        self.used_area += footprint.width * footprint.height;

        trace!(
            "Packed {}x{} at ({}, {}){}",
            footprint.width,
            footprint.height,
            x,
            y,
            if wrapped { " on a new row" } else { "" }
        );
        Ok(Placement { x, y, wrapped })
    }

    /// Upper bound on how many more footprints can be placed when none is
    /// smaller than `min_side` texels on either axis.
    ///
    /// Every glyph consumes at least `min_side + GUTTER` along the row and
    /// every new row at least as much downwards, so a batch longer than this
    /// can be rejected without measuring a single outline.
    pub fn remaining_capacity(&self, min_side: f32) -> u64 {
        let size = self.texture_size as f64;
        let cell = (min_side.max(0.0) + GUTTER) as f64;
        let fit = |span: f64| (span / cell).floor().max(0.0) as u64;
        let current_row = fit(size - self.offset_x as f64 + GUTTER as f64);
        let rows_below = fit(size - self.offset_y as f64 - self.row_height as f64);
        current_row + rows_below * fit(size)
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size as u32
    }

    /// Next free position on the current row.
    pub fn cursor(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }

    pub fn stats(&self) -> AtlasStats {
        let total = self.texture_size * self.texture_size;
        AtlasStats {
            glyphs: self.placed,
            rows: self.rows,
            used_area: self.used_area,
            utilization: if total > 0.0 { self.used_area / total } else { 0.0 },
            cursor: self.cursor(),
            row_height: self.row_height,
        }
    }
}

/// Snapshot of atlas usage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AtlasStats {
    pub glyphs: u32,
    pub rows: u32,
    /// Sum of footprint areas, gutters excluded.
    pub used_area: f32,
    /// `used_area / texture_size²`.
    pub utilization: f32,
    pub cursor: (f32, f32),
    pub row_height: f32,
}

/// One generated glyph, as stored in the index texture.
///
/// Eight floats, read by the render geometry stage at `slot * 8`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize)]
pub struct GlyphIndexEntry {
    /// Footprint origin in the atlas, texels.
    pub atlas_x: f32,
    pub atlas_y: f32,
    /// Footprint size, texels.
    pub footprint_w: f32,
    pub footprint_h: f32,
    /// Outline units.
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub glyph_width: f32,
    pub glyph_height: f32,
}

impl GlyphIndexEntry {
    pub const FLOATS: usize = 8;

    pub fn new(placement: Placement, footprint: Footprint, metrics: &GlyphMetrics) -> Self {
        Self {
            atlas_x: placement.x,
            atlas_y: placement.y,
            footprint_w: footprint.width,
            footprint_h: footprint.height,
            bearing_x: metrics.bearing_x,
            bearing_y: metrics.bearing_y,
            glyph_width: metrics.width,
            glyph_height: metrics.height,
        }
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.footprint_w, self.footprint_h)
    }

    /// Footprint rectangles intersect.
    pub fn overlaps(&self, other: &GlyphIndexEntry) -> bool {
        !(self.atlas_x + self.footprint_w <= other.atlas_x
            || other.atlas_x + other.footprint_w <= self.atlas_x
            || self.atlas_y + self.footprint_h <= other.atlas_y
            || other.atlas_y + other.footprint_h <= self.atlas_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(packer: &mut ShelfPacker, sizes: &[(f32, f32)]) -> Vec<GlyphIndexEntry> {
        sizes
            .iter()
            .map(|&(w, h)| {
                let footprint = Footprint::new(w, h);
                let placement = packer.place(footprint).unwrap();
                GlyphIndexEntry::new(placement, footprint, &GlyphMetrics::default())
            })
            .collect()
    }

    #[test]
    fn starts_inside_the_border_gutter() {
        let mut packer = ShelfPacker::new(64);
        let p = packer.place(Footprint::new(10.0, 12.0)).unwrap();
        assert_eq!((p.x, p.y), (1.0, 1.0));
        assert!(!p.wrapped);
        assert_eq!(packer.cursor(), (12.0, 1.0));
    }

    #[test]
    fn wraps_below_tallest_glyph_of_row() {
        let mut packer = ShelfPacker::new(32);
        let placed = entries(&mut packer, &[(10.0, 5.0), (10.0, 9.0), (10.0, 4.0), (10.0, 3.0)]);
        // Cursor sits at 23 after two glyphs, so the third wraps.
        assert_eq!(placed[2].atlas_x, 1.0);
        assert_eq!(placed[2].atlas_y, 1.0 + 9.0 + 1.0);
        assert_eq!(placed[3].atlas_x, 12.0);
        assert_eq!(placed[3].atlas_y, placed[2].atlas_y);
        assert_eq!(packer.stats().rows, 2);
    }

    #[test]
    fn placements_never_overlap() {
        let mut packer = ShelfPacker::new(256);
        let sizes: Vec<(f32, f32)> = (0..120)
            .map(|i| (4.0 + (i * 7 % 23) as f32, 6.0 + (i * 5 % 17) as f32))
            .collect();
        let placed = entries(&mut packer, &sizes);
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
            assert!(a.atlas_x + a.footprint_w <= 256.0);
            assert!(a.atlas_y + a.footprint_h <= 256.0);
        }
    }

    #[test]
    fn offset_y_is_monotonic_and_x_resets_only_on_wrap() {
        let mut packer = ShelfPacker::new(100);
        let mut last_y = 0.0;
        for i in 0..40 {
            let footprint = Footprint::new(10.0 + (i % 5) as f32 * 3.0, 8.0);
            let p = packer.place(footprint).unwrap();
            assert!(p.y >= last_y);
            assert_eq!(p.x == GUTTER, p.wrapped || i == 0, "glyph {i} at x={}", p.x);
            last_y = p.y;
        }
    }

    #[test]
    fn full_atlas_is_reported_not_wrapped() {
        let mut packer = ShelfPacker::new(24);
        // Two 10x10 per row, two rows: 1 + 10 + 1 + 10 + 1 = 23.
        for _ in 0..4 {
            packer.place(Footprint::new(10.0, 10.0)).unwrap();
        }
        let before = packer.cursor();
        assert_eq!(packer.place(Footprint::new(10.0, 10.0)), Err(PackError::Full));
        assert_eq!(packer.cursor(), before, "failed placement must not move the cursor");
        assert_eq!(packer.stats().glyphs, 4);
    }

    #[test]
    fn remaining_capacity_bounds_what_fits() {
        let mut packer = ShelfPacker::new(24);
        let bound = packer.remaining_capacity(10.0);
        let mut placed = 0;
        while packer.place(Footprint::new(10.0, 10.0)).is_ok() {
            placed += 1;
        }
        assert_eq!(placed, 4);
        assert!(bound >= placed);
        assert_eq!(packer.remaining_capacity(10.0), 0);
        // Small glyphs may still find room where large ones do not.
        assert!(ShelfPacker::new(24).remaining_capacity(1.0) > bound);
    }

    #[test]
    fn oversized_footprint_is_too_large() {
        let mut packer = ShelfPacker::new(16);
        assert_eq!(packer.place(Footprint::new(16.0, 4.0)), Err(PackError::TooLarge));
        assert_eq!(packer.place(Footprint::new(4.0, 15.5)), Err(PackError::TooLarge));
        assert!(packer.place(Footprint::new(15.0, 15.0)).is_ok());
    }

    #[test]
    fn footprint_adds_range_then_scales() {
        let metrics = GlyphMetrics {
            width: 7.0,
            height: 11.0,
            ..Default::default()
        };
        let fp = Footprint::for_glyph(&metrics, 2.0, 2.0);
        assert!((fp.width - 18.0).abs() < 0.001);
        assert!((fp.height - 26.0).abs() < 0.001);
    }

    #[test]
    fn index_entry_is_eight_floats() {
        assert_eq!(
            std::mem::size_of::<GlyphIndexEntry>(),
            GlyphIndexEntry::FLOATS * std::mem::size_of::<f32>()
        );
    }
}
