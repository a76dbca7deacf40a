//! Shared fixtures: a synthetic font whose glyphs are plain rectangles.

#![allow(dead_code)]

use std::rc::Rc;

use glyphfield::outline::{
    BufferSizes, Contour, GlyphMetrics, OutlineError, OutlineSource, Point, Segment, Shape,
    DEFAULT_ANGLE_THRESHOLD,
};
use glyphfield::{Context, FontParams, RecordingBackend};

/// Line height reported by [`Rectangles`].
pub const LINE_HEIGHT: f32 = 12.0;

/// Every glyph id maps to a rectangle whose size depends on the id.
#[derive(Debug, Default)]
pub struct Rectangles {
    fail_on: Option<u32>,
}

impl Rectangles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same glyphs, but serializing `glyph_id` fails.
    pub fn failing_on(glyph_id: u32) -> Self {
        Self {
            fail_on: Some(glyph_id),
        }
    }

    pub fn metrics(glyph_id: u32) -> GlyphMetrics {
        let width = 4.0 + (glyph_id % 5) as f32;
        let height = 8.0 + (glyph_id % 3) as f32;
        GlyphMetrics {
            width,
            height,
            bearing_x: 0.5,
            bearing_y: height,
            advance: width + 1.0,
        }
    }

    pub fn shape(glyph_id: u32) -> Shape {
        let m = Self::metrics(glyph_id);
        let (x0, y0) = (m.bearing_x, m.bearing_y - m.height);
        let (x1, y1) = (m.bearing_x + m.width, m.bearing_y);
        let corners = [
            Point::new(x0, y0),
            Point::new(x0, y1),
            Point::new(x1, y1),
            Point::new(x1, y0),
        ];
        let segments = (0..4)
            .map(|i| Segment::linear(corners[i], corners[(i + 1) % 4]))
            .collect();
        let mut shape = Shape::new(vec![Contour::new(segments)]);
        shape.normalize_winding();
        shape.color_edges(DEFAULT_ANGLE_THRESHOLD);
        shape
    }
}

impl OutlineSource for Rectangles {
    fn buffer_sizes(&self, glyph_id: u32) -> Result<BufferSizes, OutlineError> {
        Self::shape(glyph_id).buffer_sizes()
    }

    fn serialize(
        &self,
        glyph_id: u32,
        meta: &mut [u8],
        points: &mut [u8],
    ) -> Result<GlyphMetrics, OutlineError> {
        if self.fail_on == Some(glyph_id) {
            return Err(OutlineError::Other(format!("no outline for {glyph_id}")));
        }
        Self::shape(glyph_id).serialize_into(meta, points)?;
        Ok(Self::metrics(glyph_id))
    }

    fn vertical_advance(&self) -> f32 {
        LINE_HEIGHT
    }
}

pub fn backend() -> Rc<RecordingBackend> {
    Rc::new(RecordingBackend::new())
}

pub fn context(backend: &Rc<RecordingBackend>) -> Context<RecordingBackend> {
    Context::create(Rc::clone(backend)).expect("context creation failed")
}

pub fn params(range: f32, scale: f32, texture_size: u32) -> FontParams {
    FontParams {
        range,
        scale,
        texture_size,
    }
}
