//! TrueType/OpenType outlines via ttf-parser.

use std::cell::RefCell;
use std::path::Path;

use owned_ttf_parser::{AsFaceRef, OwnedFace};
use tracing::{info, trace};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::coloring::DEFAULT_ANGLE_THRESHOLD;
use super::shape::{Contour, Point, Segment, Shape};
use super::{BufferSizes, GlyphMetrics, OutlineError, OutlineSource};

/// Outline source backed by a font file.
///
/// Glyph ids are Unicode code points. Code points the font does not map
/// resolve to `.notdef`. Coordinates are scaled so one em spans `em_size`
/// outline units.
///
/// The face is parsed once. The last shape measured by
/// [`buffer_sizes`](OutlineSource::buffer_sizes) is kept so the following
/// [`serialize`](OutlineSource::serialize) of the same glyph reuses it.
pub struct TtfOutlines {
    face: OwnedFace,
    face_index: u32,
    em_size: f32,
    units_per_em: f32,
    vertical_advance: f32,
    angle_threshold: f32,
    last_shape: RefCell<Option<(u32, Shape, GlyphMetrics)>>,
}

impl TtfOutlines {
    pub fn open(path: impl AsRef<Path>, face_index: u32, em_size: f32) -> Result<Self, OutlineError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let outlines = Self::from_bytes(data, face_index, em_size)?;
        info!(
            "Loaded font {} (face {}, {} units/em)",
            path.display(),
            face_index,
            outlines.units_per_em
        );
        Ok(outlines)
    }

    pub fn from_bytes(data: Vec<u8>, face_index: u32, em_size: f32) -> Result<Self, OutlineError> {
        let face = OwnedFace::from_vec(data, face_index)?;
        let parsed = face.as_face_ref();
        let tables = parsed.tables();
        if tables.glyf.is_none() && tables.cff.is_none() && tables.cff2.is_none() {
            return Err(OutlineError::MissingOutlines(face_index));
        }
        let units_per_em = parsed.units_per_em() as f32;
        let unit = em_size / units_per_em;
        let vertical_advance = (parsed.ascender() as f32 - parsed.descender() as f32
            + parsed.line_gap() as f32)
            * unit;
        Ok(Self {
            face,
            face_index,
            em_size,
            units_per_em,
            vertical_advance,
            angle_threshold: DEFAULT_ANGLE_THRESHOLD,
            last_shape: RefCell::new(None),
        })
    }

    /// Override the corner angle used for edge coloring.
    pub fn with_angle_threshold(mut self, radians: f32) -> Self {
        self.angle_threshold = radians;
        self.last_shape = RefCell::new(None);
        self
    }

    pub fn em_size(&self) -> f32 {
        self.em_size
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    fn unit(&self) -> f32 {
        self.em_size / self.units_per_em
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    /// Colored, winding-normalized outline plus metrics for a code point.
    pub fn shape(&self, glyph_id: u32) -> Result<(Shape, GlyphMetrics), OutlineError> {
        let face = self.face();
        let ch = char::from_u32(glyph_id).ok_or(OutlineError::InvalidCodePoint(glyph_id))?;
        let gid = face.glyph_index(ch).unwrap_or_else(|| {
            trace!("No cmap entry for U+{:04X}, using .notdef", glyph_id);
            GlyphId(0)
        });

        let unit = self.unit();
        let mut builder = ShapeBuilder::new(unit);
        let bbox = face.outline_glyph(gid, &mut builder);
        let mut shape = builder.finish();

        let advance = face.glyph_hor_advance(gid).map_or(0.0, |a| a as f32 * unit);
        let metrics = match bbox {
            Some(rect) => GlyphMetrics {
                width: (rect.x_max as f32 - rect.x_min as f32) * unit,
                height: (rect.y_max as f32 - rect.y_min as f32) * unit,
                bearing_x: rect.x_min as f32 * unit,
                bearing_y: rect.y_max as f32 * unit,
                advance,
            },
            None => GlyphMetrics {
                advance,
                ..GlyphMetrics::default()
            },
        };

        shape.normalize_winding();
        shape.color_edges(self.angle_threshold);
        Ok((shape, metrics))
    }

    /// The shape remembered from the last `buffer_sizes` call if it was for
    /// `glyph_id`, otherwise a fresh one.
    fn take_shape(&self, glyph_id: u32) -> Result<(Shape, GlyphMetrics), OutlineError> {
        match self.last_shape.borrow_mut().take() {
            Some((id, shape, metrics)) if id == glyph_id => Ok((shape, metrics)),
            _ => self.shape(glyph_id),
        }
    }
}

impl OutlineSource for TtfOutlines {
    fn buffer_sizes(&self, glyph_id: u32) -> Result<BufferSizes, OutlineError> {
        let (shape, metrics) = self.shape(glyph_id)?;
        let sizes = shape.buffer_sizes()?;
        *self.last_shape.borrow_mut() = Some((glyph_id, shape, metrics));
        Ok(sizes)
    }

    fn serialize(
        &self,
        glyph_id: u32,
        meta: &mut [u8],
        points: &mut [u8],
    ) -> Result<GlyphMetrics, OutlineError> {
        let (shape, metrics) = self.take_shape(glyph_id)?;
        shape.serialize_into(meta, points)?;
        Ok(metrics)
    }

    fn vertical_advance(&self) -> f32 {
        self.vertical_advance
    }
}

/// Collects ttf-parser callbacks into closed contours.
struct ShapeBuilder {
    unit: f32,
    contours: Vec<Contour>,
    current: Vec<Segment>,
    start: Point,
    cursor: Point,
}

impl ShapeBuilder {
    fn new(unit: f32) -> Self {
        Self {
            unit,
            contours: Vec::new(),
            current: Vec::new(),
            start: Point::ZERO,
            cursor: Point::ZERO,
        }
    }

    fn point(&self, x: f32, y: f32) -> Point {
        Point::new(x * self.unit, y * self.unit)
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.contours
                .push(Contour::new(std::mem::take(&mut self.current)));
        }
    }

    fn finish(mut self) -> Shape {
        self.close();
        Shape::new(self.contours)
    }
}

impl OutlineBuilder for ShapeBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close();
        self.start = self.point(x, y);
        self.cursor = self.start;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        if p != self.cursor {
            self.current.push(Segment::linear(self.cursor, p));
            self.cursor = p;
        }
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p = self.point(x, y);
        self.current
            .push(Segment::quadratic(self.cursor, self.point(x1, y1), p));
        self.cursor = p;
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p = self.point(x, y);
        self.current.push(Segment::cubic(
            self.cursor,
            self.point(x1, y1),
            self.point(x2, y2),
            p,
        ));
        self.cursor = p;
    }

    fn close(&mut self) {
        if !self.current.is_empty() && self.cursor != self.start {
            self.current.push(Segment::linear(self.cursor, self.start));
            self.cursor = self.start;
        }
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_closes_open_contours() {
        let mut builder = ShapeBuilder::new(0.5);
        builder.move_to(0.0, 0.0);
        builder.line_to(0.0, 10.0);
        builder.line_to(10.0, 10.0);
        builder.line_to(10.0, 10.0); // zero-length, dropped
        builder.move_to(20.0, 0.0);
        builder.quad_to(25.0, 10.0, 30.0, 0.0);
        builder.close();
        let shape = builder.finish();

        assert_eq!(shape.contours.len(), 2);
        let first = &shape.contours[0].segments;
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].end(), Point::new(0.0, 0.0));
        assert_eq!(first[1].end(), Point::new(5.0, 5.0));
        assert_eq!(shape.contours[1].segments[0].degree(), 2);
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = TtfOutlines::from_bytes(vec![0u8; 64], 0, 16.0);
        assert!(matches!(err, Err(OutlineError::Parse(_))));
    }
}
