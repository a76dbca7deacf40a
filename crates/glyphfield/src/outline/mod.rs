//! Glyph outline sources.
//!
//! The generator never parses fonts itself. It asks an [`OutlineSource`] for
//! two byte streams per glyph and samples them from the fragment stage:
//!
//! ```text
//! meta stream (u8 texels)                 point stream (f32 texels)
//! ┌──────────────┐                        ┌─────────────────────────┐
//! │ u16 contours │                        │ contour 0: P0 P1 .. Pn  │
//! ├──────────────┤                        │ contour 1: P0 P1 .. Pm  │
//! │ u16 segments │ ─┐ per contour         │ ...                     │
//! │ tag tag tag  │ ─┘                     └─────────────────────────┘
//! └──────────────┘
//! tag = (channel mask << 2) | degree      segments share endpoints, so a
//!                                         contour stores 1 + Σdegree points
//! ```
//!
//! Sizing and filling are separate calls so the caller can allocate one
//! exactly-sized host buffer for a whole batch before serializing into it.

mod coloring;
mod shape;
mod ttf;

pub use coloring::{EdgeColor, DEFAULT_ANGLE_THRESHOLD};
pub use shape::{Contour, Point, Segment, SegmentKind, Shape, POINT_BYTES};
pub use ttf::TtfOutlines;

use thiserror::Error;

/// Errors raised by an outline source.
#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse font: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),

    #[error("font face {0} has no glyf, CFF or CFF2 outlines")]
    MissingOutlines(u32),

    #[error("glyph id {0} is not a Unicode scalar value")]
    InvalidCodePoint(u32),

    #[error("{what} count {count} does not fit the u16 stream header")]
    TooComplex { what: &'static str, count: usize },

    #[error("{stream} buffer is {actual} bytes, outline needs {expected}")]
    BufferSize {
        stream: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0}")]
    Other(String),
}

/// Byte sizes of one glyph's serialized streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferSizes {
    pub meta: usize,
    pub points: usize,
}

impl std::ops::Add for BufferSizes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            meta: self.meta + rhs.meta,
            points: self.points + rhs.points,
        }
    }
}

/// Metrics captured while serializing a glyph, in outline units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphMetrics {
    /// Outline bounding box width.
    pub width: f32,
    /// Outline bounding box height.
    pub height: f32,
    /// Pen origin to left edge of the bounding box.
    pub bearing_x: f32,
    /// Baseline to top edge of the bounding box.
    pub bearing_y: f32,
    /// Pen advance after this glyph.
    pub advance: f32,
}

/// Provider of serialized glyph outlines.
///
/// Implementations must be deterministic: the same glyph id always yields the
/// same sizes, bytes and metrics.
pub trait OutlineSource {
    /// Byte sizes `serialize` will write for `glyph_id`.
    fn buffer_sizes(&self, glyph_id: u32) -> Result<BufferSizes, OutlineError>;

    /// Write the glyph's streams into buffers of exactly the sizes reported by
    /// [`buffer_sizes`](Self::buffer_sizes).
    fn serialize(
        &self,
        glyph_id: u32,
        meta: &mut [u8],
        points: &mut [u8],
    ) -> Result<GlyphMetrics, OutlineError>;

    /// Line height in outline units.
    fn vertical_advance(&self) -> f32;
}

impl<T: OutlineSource + ?Sized> OutlineSource for &T {
    fn buffer_sizes(&self, glyph_id: u32) -> Result<BufferSizes, OutlineError> {
        (**self).buffer_sizes(glyph_id)
    }

    fn serialize(
        &self,
        glyph_id: u32,
        meta: &mut [u8],
        points: &mut [u8],
    ) -> Result<GlyphMetrics, OutlineError> {
        (**self).serialize(glyph_id, meta, points)
    }

    fn vertical_advance(&self) -> f32 {
        (**self).vertical_advance()
    }
}
