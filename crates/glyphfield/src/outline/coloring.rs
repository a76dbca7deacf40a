//! Edge coloring.
//!
//! Each segment is written to a subset of the R/G/B channels. At a sharp
//! corner the two meeting edges must share exactly one channel: the other two
//! channels then disagree near the corner and the median keeps it sharp.
//! Smooth joins may share more.

use super::shape::{Contour, Segment};

/// Corners sharper than this (radians between tangents) get a color switch.
pub const DEFAULT_ANGLE_THRESHOLD: f32 = 3.0;

/// Channel mask of a segment: bit 0 red, bit 1 green, bit 2 blue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeColor(u8);

impl EdgeColor {
    pub const BLACK: Self = Self(0);
    pub const RED: Self = Self(1);
    pub const GREEN: Self = Self(2);
    pub const YELLOW: Self = Self(3);
    pub const BLUE: Self = Self(4);
    pub const MAGENTA: Self = Self(5);
    pub const CYAN: Self = Self(6);
    pub const WHITE: Self = Self(7);

    /// Mask value as stored in the meta stream.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    /// Number of channels this edge writes.
    pub fn channels(self) -> u32 {
        self.0.count_ones()
    }

    pub fn shares(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "black",
            1 => "red",
            2 => "green",
            3 => "yellow",
            4 => "blue",
            5 => "magenta",
            6 => "cyan",
            _ => "white",
        }
    }
}

impl std::fmt::Display for EdgeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Two-channel colors used between corners.
const CYCLE: [EdgeColor; 3] = [EdgeColor::CYAN, EdgeColor::MAGENTA, EdgeColor::YELLOW];

/// Next color in the cycle that differs from `current` and `banned`.
fn switch_color(current: EdgeColor, banned: Option<EdgeColor>) -> EdgeColor {
    CYCLE
        .iter()
        .copied()
        .find(|&c| c != current && Some(c) != banned)
        .unwrap_or(EdgeColor::CYAN)
}

fn is_corner(incoming: &Segment, outgoing: &Segment, cross_threshold: f32) -> bool {
    let a = incoming.end_direction().normalize_or_zero();
    let b = outgoing.start_direction().normalize_or_zero();
    a.dot(b) <= 0.0 || a.perp_dot(b).abs() > cross_threshold
}

/// Map position `i` of `n` onto -1, 0 or 1, splitting the loop into
/// three runs of roughly equal length.
fn symmetrical_trichotomy(i: usize, n: usize) -> usize {
    let spread = 3.0 + 2.875 * i as f32 / (n as f32 - 1.0) - 1.4375 + 0.5;
    (spread as i32 - 2).clamp(0, 2) as usize
}

pub(crate) fn color_contour(contour: &mut Contour, angle_threshold: f32) {
    let n = contour.segments.len();
    if n == 0 {
        return;
    }
    let cross_threshold = angle_threshold.sin();
    let corners: Vec<usize> = (0..n)
        .filter(|&i| {
            let prev = &contour.segments[(i + n - 1) % n];
            is_corner(prev, &contour.segments[i], cross_threshold)
        })
        .collect();

    match corners.as_slice() {
        [] => {
            for segment in &mut contour.segments {
                segment.color = EdgeColor::WHITE;
            }
        }
        [corner] => color_teardrop(contour, *corner),
        _ => color_splines(contour, &corners),
    }
}

/// One corner: three runs around the loop so the corner sees two colors.
fn color_teardrop(contour: &mut Contour, corner: usize) {
    let colors = [EdgeColor::MAGENTA, EdgeColor::WHITE, EdgeColor::YELLOW];
    let n = contour.segments.len();
    if n >= 3 {
        for i in 0..n {
            contour.segments[(corner + i) % n].color = colors[symmetrical_trichotomy(i, n)];
        }
        return;
    }

    // Too few segments for three runs: split each into thirds, starting at
    // the corner.
    let mut pieces = Vec::with_capacity(3 * n);
    for i in 0..n {
        pieces.extend(contour.segments[(corner + i) % n].split_in_thirds());
    }
    let runs: &[usize] = if n == 1 {
        &[0, 1, 2]
    } else {
        &[0, 0, 1, 1, 2, 2]
    };
    for (piece, &run) in pieces.iter_mut().zip(runs) {
        piece.color = colors[run];
    }
    contour.segments = pieces;
}

/// Several corners: every spline between two corners gets its own color, and
/// the last spline must not match the first since they meet at a corner.
fn color_splines(contour: &mut Contour, corners: &[usize]) {
    let n = contour.segments.len();
    let start = corners[0];
    let mut spline = 0;
    let initial = switch_color(EdgeColor::WHITE, None);
    let mut color = initial;
    for i in 0..n {
        let index = (start + i) % n;
        if spline + 1 < corners.len() && corners[spline + 1] == index {
            spline += 1;
            let banned = (spline == corners.len() - 1).then_some(initial);
            color = switch_color(color, banned);
        }
        contour.segments[index].color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::shape::Point;

    fn polygon(points: &[(f32, f32)]) -> Contour {
        let pts: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let segments = (0..pts.len())
            .map(|i| Segment::linear(pts[i], pts[(i + 1) % pts.len()]))
            .collect();
        Contour::new(segments)
    }

    fn assert_corners_share_one_channel(contour: &Contour) {
        let n = contour.segments.len();
        for i in 0..n {
            let a = contour.segments[i].color;
            let b = contour.segments[(i + 1) % n].color;
            assert!(a.channels() >= 2, "segment {i} has only {a}");
            assert!(
                a.shares(b).channels() >= 1,
                "segments {i} and {} share no channel",
                (i + 1) % n
            );
        }
    }

    #[test]
    fn square_corners_alternate_colors() {
        let mut square = polygon(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        color_contour(&mut square, DEFAULT_ANGLE_THRESHOLD);
        assert_corners_share_one_channel(&square);
        let n = square.segments.len();
        for i in 0..n {
            let a = square.segments[i].color;
            let b = square.segments[(i + 1) % n].color;
            assert_ne!(a, b, "corner {i} keeps the same color");
            assert_eq!(a.shares(b).channels(), 1);
        }
    }

    #[test]
    fn triangle_last_spline_differs_from_first() {
        let mut tri = polygon(&[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0)]);
        color_contour(&mut tri, DEFAULT_ANGLE_THRESHOLD);
        let colors: Vec<_> = tri.segments.iter().map(|s| s.color).collect();
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[2], colors[0]);
    }

    #[test]
    fn smooth_contour_is_white() {
        // Four quarter arcs meeting tangentially.
        let p = |x, y| Point::new(x, y);
        let mut circle = Contour::new(vec![
            Segment::quadratic(p(-1.0, 0.0), p(-1.0, 1.0), p(0.0, 1.0)),
            Segment::quadratic(p(0.0, 1.0), p(1.0, 1.0), p(1.0, 0.0)),
            Segment::quadratic(p(1.0, 0.0), p(1.0, -1.0), p(0.0, -1.0)),
            Segment::quadratic(p(0.0, -1.0), p(-1.0, -1.0), p(-1.0, 0.0)),
        ]);
        color_contour(&mut circle, DEFAULT_ANGLE_THRESHOLD);
        assert!(circle.segments.iter().all(|s| s.color == EdgeColor::WHITE));
    }

    #[test]
    fn single_corner_with_two_segments_splits_into_six() {
        // Teardrop: one cubic looping back to its own start.
        let p = |x, y| Point::new(x, y);
        let mut drop = Contour::new(vec![
            Segment::cubic(p(0.0, 0.0), p(-2.0, 3.0), p(2.0, 3.0), p(0.0, 0.0)),
        ]);
        color_contour(&mut drop, DEFAULT_ANGLE_THRESHOLD);
        assert_eq!(drop.segments.len(), 3);
        let colors: Vec<_> = drop.segments.iter().map(|s| s.color).collect();
        assert_eq!(
            colors,
            vec![EdgeColor::MAGENTA, EdgeColor::WHITE, EdgeColor::YELLOW]
        );

        let mut two = Contour::new(vec![
            Segment::quadratic(p(0.0, 0.0), p(-2.0, 3.0), p(0.0, 3.0)),
            Segment::quadratic(p(0.0, 3.0), p(2.0, 3.0), p(0.0, 0.0)),
        ]);
        color_contour(&mut two, DEFAULT_ANGLE_THRESHOLD);
        // The top join is smooth, the bottom is the only corner.
        assert_eq!(two.segments.len(), 6);
        assert_eq!(two.segments[0].start(), p(0.0, 0.0));
    }

    #[test]
    fn trichotomy_covers_three_runs() {
        let runs: Vec<usize> = (0..6).map(|i| symmetrical_trichotomy(i, 6)).collect();
        assert_eq!(runs.first(), Some(&0));
        assert_eq!(runs.last(), Some(&2));
        assert!(runs.windows(2).all(|w| w[0] <= w[1]));
        assert!(runs.contains(&1));
    }
}
