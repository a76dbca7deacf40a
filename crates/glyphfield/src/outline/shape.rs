//! Contour geometry and the byte layout the generator samples.

use std::ops::Range;

use glam::Vec2;
use kurbo::{CubicBez, Line, ParamCurve, ParamCurveArea, PathSeg, QuadBez};

use super::coloring::{self, EdgeColor};
use super::{BufferSizes, OutlineError};

/// 2D point or vector in outline units, y up.
pub type Point = Vec2;

fn to_kurbo(p: Point) -> kurbo::Point {
    kurbo::Point::new(p.x as f64, p.y as f64)
}

fn from_kurbo(p: kurbo::Point) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

/// One edge of a contour with its channel mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub color: EdgeColor,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentKind {
    Linear([Point; 2]),
    Quadratic([Point; 3]),
    Cubic([Point; 4]),
}

impl Segment {
    pub fn linear(p0: Point, p1: Point) -> Self {
        Self::white(SegmentKind::Linear([p0, p1]))
    }

    pub fn quadratic(p0: Point, p1: Point, p2: Point) -> Self {
        Self::white(SegmentKind::Quadratic([p0, p1, p2]))
    }

    pub fn cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self::white(SegmentKind::Cubic([p0, p1, p2, p3]))
    }

    fn white(kind: SegmentKind) -> Self {
        Self {
            kind,
            color: EdgeColor::WHITE,
        }
    }

    /// Control points including both endpoints.
    pub fn points(&self) -> &[Point] {
        match &self.kind {
            SegmentKind::Linear(p) => p,
            SegmentKind::Quadratic(p) => p,
            SegmentKind::Cubic(p) => p,
        }
    }

    /// 1 for lines, 2 for quadratics, 3 for cubics.
    pub fn degree(&self) -> u8 {
        (self.points().len() - 1) as u8
    }

    pub fn start(&self) -> Point {
        self.points()[0]
    }

    pub fn end(&self) -> Point {
        self.points()[self.points().len() - 1]
    }

    /// The same curve in kurbo's f64 representation.
    pub fn path_seg(&self) -> PathSeg {
        match self.kind {
            SegmentKind::Linear([a, b]) => PathSeg::Line(Line::new(to_kurbo(a), to_kurbo(b))),
            SegmentKind::Quadratic([a, b, c]) => {
                PathSeg::Quad(QuadBez::new(to_kurbo(a), to_kurbo(b), to_kurbo(c)))
            }
            SegmentKind::Cubic([a, b, c, d]) => PathSeg::Cubic(CubicBez::new(
                to_kurbo(a),
                to_kurbo(b),
                to_kurbo(c),
                to_kurbo(d),
            )),
        }
    }

    fn from_path_seg(seg: PathSeg, color: EdgeColor) -> Self {
        let kind = match seg {
            PathSeg::Line(l) => SegmentKind::Linear([from_kurbo(l.p0), from_kurbo(l.p1)]),
            PathSeg::Quad(q) => {
                SegmentKind::Quadratic([from_kurbo(q.p0), from_kurbo(q.p1), from_kurbo(q.p2)])
            }
            PathSeg::Cubic(c) => SegmentKind::Cubic([
                from_kurbo(c.p0),
                from_kurbo(c.p1),
                from_kurbo(c.p2),
                from_kurbo(c.p3),
            ]),
        };
        Self { kind, color }
    }

    pub fn point_at(&self, t: f32) -> Point {
        from_kurbo(self.path_seg().eval(t as f64))
    }

    /// The part of the segment between two parameter values, same color.
    pub fn subsegment(&self, range: Range<f64>) -> Self {
        Self::from_path_seg(self.path_seg().subsegment(range), self.color)
    }

    /// Tangent direction leaving the start point. Degenerate control points
    /// fall back to the next distinct one.
    pub fn start_direction(&self) -> Point {
        let points = self.points();
        let p0 = points[0];
        points[1..]
            .iter()
            .map(|&p| p - p0)
            .find(|d| d.length() > 0.0)
            .unwrap_or(Point::ZERO)
    }

    /// Tangent direction arriving at the end point.
    pub fn end_direction(&self) -> Point {
        let points = self.points();
        let last = points[points.len() - 1];
        points[..points.len() - 1]
            .iter()
            .rev()
            .map(|&p| last - p)
            .find(|d| d.length() > 0.0)
            .unwrap_or(Point::ZERO)
    }

    pub fn split_at(&self, t: f32) -> (Self, Self) {
        let t = t as f64;
        (self.subsegment(0.0..t), self.subsegment(t..1.0))
    }

    /// Three pieces of equal parameter length.
    pub fn split_in_thirds(&self) -> [Self; 3] {
        const THIRD: f64 = 1.0 / 3.0;
        [
            self.subsegment(0.0..THIRD),
            self.subsegment(THIRD..2.0 * THIRD),
            self.subsegment(2.0 * THIRD..1.0),
        ]
    }

    pub fn reversed(&self) -> Self {
        let kind = match self.kind {
            SegmentKind::Linear([a, b]) => SegmentKind::Linear([b, a]),
            SegmentKind::Quadratic([a, b, c]) => SegmentKind::Quadratic([c, b, a]),
            SegmentKind::Cubic([a, b, c, d]) => SegmentKind::Cubic([d, c, b, a]),
        };
        Self {
            kind,
            color: self.color,
        }
    }

    /// Signed area between the curve and the origin.
    fn signed_area(&self) -> f32 {
        self.path_seg().signed_area() as f32
    }
}

/// Closed loop of segments; each segment starts where the previous one ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub segments: Vec<Segment>,
}

impl Contour {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Positive for counter-clockwise contours in y-up space.
    pub fn signed_area(&self) -> f32 {
        self.segments.iter().map(Segment::signed_area).sum()
    }

    pub fn reverse(&mut self) {
        self.segments.reverse();
        for segment in &mut self.segments {
            *segment = segment.reversed();
        }
    }

    fn point_count(&self) -> usize {
        1 + self
            .segments
            .iter()
            .map(|s| s.degree() as usize)
            .sum::<usize>()
    }
}

/// Vector outline of one glyph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub contours: Vec<Contour>,
}

impl Shape {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.segments.is_empty())
    }

    pub fn signed_area(&self) -> f32 {
        self.contours.iter().map(Contour::signed_area).sum()
    }

    /// Orient outer contours clockwise so distances come out positive inside.
    ///
    /// TrueType outlines already are. CFF outlines wind the other way, which
    /// shows up as a positive total area.
    pub fn normalize_winding(&mut self) {
        if self.signed_area() > 0.0 {
            for contour in &mut self.contours {
                contour.reverse();
            }
        }
    }

    /// Assign channel masks so corners stay sharp after reconstruction.
    pub fn color_edges(&mut self, angle_threshold: f32) {
        for contour in &mut self.contours {
            coloring::color_contour(contour, angle_threshold);
        }
    }

    /// Control-point bounding box as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut points = self
            .contours
            .iter()
            .flat_map(|c| c.segments.iter())
            .flat_map(|s| s.points().iter().copied());
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Stream sizes [`serialize_into`](Self::serialize_into) will write.
    pub fn buffer_sizes(&self) -> Result<BufferSizes, OutlineError> {
        check_u16("contour", self.contours.len())?;
        let mut sizes = BufferSizes {
            meta: 2,
            points: 0,
        };
        for contour in &self.contours {
            check_u16("segment", contour.segments.len())?;
            sizes.meta += 2 + contour.segments.len();
            sizes.points += contour.point_count() * POINT_BYTES;
        }
        Ok(sizes)
    }

    /// Write both streams. The buffers must match [`buffer_sizes`](Self::buffer_sizes) exactly.
    pub fn serialize_into(&self, meta: &mut [u8], points: &mut [u8]) -> Result<(), OutlineError> {
        let sizes = self.buffer_sizes()?;
        check_len("meta", sizes.meta, meta.len())?;
        check_len("point", sizes.points, points.len())?;

        let mut m = 0;
        let put_u16 = |meta: &mut [u8], m: &mut usize, value: usize| {
            meta[*m..*m + 2].copy_from_slice(&(value as u16).to_le_bytes());
            *m += 2;
        };
        put_u16(meta, &mut m, self.contours.len());

        let mut chunks = points.chunks_exact_mut(POINT_BYTES);
        let mut put_point = |p: Point| {
            if let Some(chunk) = chunks.next() {
                chunk[..4].copy_from_slice(&p.x.to_ne_bytes());
                chunk[4..].copy_from_slice(&p.y.to_ne_bytes());
            }
        };

        for contour in &self.contours {
            put_u16(meta, &mut m, contour.segments.len());
            let Some(first) = contour.segments.first() else {
                put_point(Point::ZERO);
                continue;
            };
            put_point(first.start());
            for segment in &contour.segments {
                meta[m] = (segment.color.bits() << 2) | segment.degree();
                m += 1;
                for &p in &segment.points()[1..] {
                    put_point(p);
                }
            }
        }
        Ok(())
    }
}

/// Two native-endian f32 per point, matching the R32F point texture.
pub const POINT_BYTES: usize = 2 * std::mem::size_of::<f32>();

fn check_u16(what: &'static str, count: usize) -> Result<(), OutlineError> {
    if count > u16::MAX as usize {
        return Err(OutlineError::TooComplex { what, count });
    }
    Ok(())
}

fn check_len(stream: &'static str, expected: usize, actual: usize) -> Result<(), OutlineError> {
    if expected != actual {
        return Err(OutlineError::BufferSize {
            stream,
            expected,
            actual,
        });
    }
    Ok(())
}
