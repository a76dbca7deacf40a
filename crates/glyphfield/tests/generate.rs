//! Atlas generation against the recording backend.

mod common;

use glam::Vec2;
use glyphfield::atlas::GUTTER;
use glyphfield::backend::{Primitive, UniformValue};
use glyphfield::shaders::DATA_ROW;
use glyphfield::{Backend, Error, Font, GlyphIndexEntry};

use common::{backend, context, params, Rectangles, LINE_HEIGHT};

const A: u32 = 'A' as u32;
const Z: u32 = 'Z' as u32;

fn assert_disjoint(entries: &[GlyphIndexEntry], texture_size: f32) {
    for (i, a) in entries.iter().enumerate() {
        assert!(a.atlas_x >= GUTTER && a.atlas_y >= GUTTER, "{a:?} touches the border");
        assert!(a.atlas_x + a.footprint_w <= texture_size);
        assert!(a.atlas_y + a.footprint_h <= texture_size);
        for b in &entries[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn test_uppercase_scenario() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 512)).unwrap();

    assert_eq!(font.generate(A..=Z).unwrap(), 26);
    assert_eq!(font.entries().len(), 26);
    for entry in font.entries() {
        assert!(entry.atlas_y >= 1.0 && entry.atlas_y < 512.0);
    }
    assert_disjoint(font.entries(), 512.0);

    let draws = backend.draws();
    assert_eq!(draws.len(), 26);
    assert!(draws.iter().all(|&d| d == (Primitive::Triangles, 0, 6)));
}

#[test]
fn test_footprint_follows_metrics() {
    let backend = backend();
    let ctx = context(&backend);
    let (range, scale) = (3.0, 1.5);
    let mut font = Font::new(&ctx, Rectangles::new(), params(range, scale, 512)).unwrap();
    font.generate(A..=Z).unwrap();

    for id in A..=Z {
        let metrics = Rectangles::metrics(id);
        let entry = font.entry(id).unwrap();
        assert!((entry.footprint_w - (metrics.width + range) * scale).abs() < 1e-4);
        assert!((entry.footprint_h - (metrics.height + range) * scale).abs() < 1e-4);
        assert!((entry.bearing_x - metrics.bearing_x).abs() < 1e-6);
        assert!((entry.bearing_y - metrics.bearing_y).abs() < 1e-6);
        assert!((entry.glyph_width - metrics.width).abs() < 1e-6);
        assert!((entry.glyph_height - metrics.height).abs() < 1e-6);
        assert_eq!(font.horizontal_advance(id), Some(metrics.advance));
    }
}

#[test]
fn test_rows_are_monotonic() {
    let backend = backend();
    let ctx = context(&backend);
    // Narrow atlas so the batch spans several rows.
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 128)).unwrap();
    font.generate(A..=('A' as u32 + 19)).unwrap();

    let entries = font.entries();
    assert!(font.atlas_stats().rows > 1);
    for pair in entries.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(next.atlas_y >= prev.atlas_y);
        if next.atlas_y > prev.atlas_y {
            assert_eq!(next.atlas_x, GUTTER, "new row must start at the gutter");
        } else {
            assert_eq!(next.atlas_x, prev.atlas_x + prev.footprint_w + GUTTER);
        }
    }
}

#[test]
fn test_cursor_persists_across_batches() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 512)).unwrap();
    font.generate(A..=A + 9).unwrap();
    font.generate_list(&['a' as u32, 'b' as u32, '0' as u32]).unwrap();
    font.generate_glyph('?' as u32).unwrap();

    assert_eq!(font.entries().len(), 14);
    assert_eq!(font.atlas_stats().glyphs, 14);
    assert_disjoint(font.entries(), 512.0);
    // Slots follow generation order.
    let glyphs = font.glyphs();
    assert_eq!(glyphs[10].0, 'a' as u32);
    assert_eq!(glyphs[13].0, '?' as u32);
}

#[test]
fn test_ascii_advances() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 512)).unwrap();

    assert_eq!(font.generate_ascii().unwrap(), 128);
    assert_eq!(font.horizontal_advances().len(), 128);
    assert!(font.horizontal_advances().values().all(|&a| a > 0.0));
    assert_eq!(font.vertical_advance(), LINE_HEIGHT);
}

#[test]
fn test_extended_ascii_covers_latin1() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 512)).unwrap();

    assert_eq!(font.generate_ascii_ext().unwrap(), 256);
    assert!(font.entry(0xFF).is_some());
    assert_disjoint(font.entries(), 512.0);
}

#[test]
fn test_huge_batch_is_rejected_up_front() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 64)).unwrap();

    let err = font.generate(0..=u32::MAX).unwrap_err();
    match err {
        Error::BatchTooLarge {
            requested,
            capacity,
        } => {
            assert_eq!(requested, 1 << 32);
            // 64 / (2 * 2 + 1) footprints per row and per column at most.
            assert!(capacity <= 13 * 13, "capacity {capacity}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let ids: Vec<u32> = (0..1000).collect();
    let err = font.generate_list(&ids).unwrap_err();
    assert!(matches!(err, Error::BatchTooLarge { requested: 1000, .. }));
    assert!(err.is_capacity());
    assert!(font.entries().is_empty());
    assert!(backend.draws().is_empty());

    // A batch within the bound still goes through the packer as usual.
    assert_eq!(font.generate(A..=A + 3).unwrap(), 4);
}

#[test]
fn test_failed_outline_leaves_font_untouched() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::failing_on('M' as u32), params(2.0, 2.0, 512))
        .unwrap();
    font.generate_glyph('!' as u32).unwrap();
    let stats_before = font.atlas_stats();
    let draws_before = backend.draws().len();

    let err = font.generate(A..=Z).unwrap_err();
    assert!(
        matches!(err, Error::Outline { glyph_id, .. } if glyph_id == 'M' as u32),
        "unexpected error: {err}"
    );
    assert_eq!(font.entries().len(), 1);
    assert_eq!(font.horizontal_advances().len(), 1);
    assert!(font.horizontal_advance(A).is_none());
    assert_eq!(font.atlas_stats(), stats_before);
    assert_eq!(backend.draws().len(), draws_before);

    // Ids before the bad one still generate on their own.
    assert_eq!(font.generate(A..=('M' as u32 - 1)).unwrap(), 12);
}

#[test]
fn test_atlas_overflow_is_reported() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 64)).unwrap();
    font.generate(A..=A + 1).unwrap();
    let stats_before = font.atlas_stats();

    let err = font.generate(A + 2..=Z).unwrap_err();
    assert!(matches!(err, Error::AtlasFull { texture_size: 64, .. }), "{err}");
    assert!(err.is_capacity());
    assert_eq!(font.entries().len(), 2);
    assert_eq!(font.atlas_stats(), stats_before);
}

#[test]
fn test_glyph_larger_than_atlas_is_rejected() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 16)).unwrap();
    let err = font.generate_glyph(A).unwrap_err();
    assert!(matches!(err, Error::AtlasFull { glyph_id: A, .. }));
    assert!(font.entries().is_empty());
}

#[test]
fn test_invalid_batches() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 256)).unwrap();

    #[allow(clippy::reversed_empty_ranges)]
    let err = font.generate(10..=5).unwrap_err();
    assert!(matches!(err, Error::InvalidRange { first: 10, last: 5 }));
    assert!(matches!(font.generate_list(&[]), Err(Error::EmptyBatch)));
    assert!(font.entries().is_empty());
    assert!(backend.draws().is_empty());
}

#[test]
fn test_regeneration_is_rejected() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 256)).unwrap();
    font.generate_glyph(A).unwrap();

    let err = font.generate(A - 1..=A + 1).unwrap_err();
    assert!(matches!(err, Error::AlreadyGenerated { glyph_id: A }));
    let err = font.generate_list(&[A + 5, A + 5]).unwrap_err();
    assert!(matches!(err, Error::AlreadyGenerated { glyph_id } if glyph_id == A + 5));
    assert_eq!(font.entries().len(), 1);
}

#[test]
fn test_generator_uniforms_follow_entries() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 256)).unwrap();
    font.generate(A..=A + 1).unwrap();

    // 'A': 4 x 10, bearing (0.5, 10). Footprint (4 + 2) * 2 by (10 + 2) * 2.
    assert_eq!(
        backend.uniform_values("translate")[0],
        UniformValue::Vec2(Vec2::new(0.5, 1.0))
    );
    assert_eq!(
        backend.uniform_values("glyph_height")[0],
        UniformValue::Float(24.0)
    );
    assert_eq!(
        backend.uniform_values("offset"),
        vec![
            UniformValue::Vec2(Vec2::new(1.0, 1.0)),
            UniformValue::Vec2(Vec2::new(1.0 + 12.0 + GUTTER, 1.0)),
        ]
    );
    // A rectangle is 8 meta bytes and 5 points.
    assert_eq!(
        backend.uniform_values("meta_offset"),
        vec![UniformValue::Int(0), UniformValue::Int(8)]
    );
    assert_eq!(
        backend.uniform_values("point_offset"),
        vec![UniformValue::Int(0), UniformValue::Int(5)]
    );
    assert_eq!(
        backend.uniform_values("range"),
        vec![UniformValue::Float(2.0)]
    );
}

#[test]
fn test_index_texture_holds_every_entry() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 256)).unwrap();
    font.generate(A..=A + 2).unwrap();
    font.generate_glyph(Z).unwrap();

    let data = backend.texture_data(font.index_texture()).unwrap();
    assert_eq!(data.width as usize, DATA_ROW);
    assert_eq!(data.height, 1);
    let stored: Vec<f32> = data
        .bytes
        .chunks_exact(4)
        .take(4 * GlyphIndexEntry::FLOATS)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let expected: &[f32] = bytemuck::cast_slice(font.entries());
    assert_eq!(stored, expected);
    // The rest of the row is zero padding.
    assert!(data.bytes[4 * GlyphIndexEntry::FLOATS * 4..].iter().all(|&b| b == 0));
}

#[test]
fn test_bindings_restored_after_generation() {
    let backend = backend();
    let ctx = context(&backend);
    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 256)).unwrap();
    let viewport = backend.viewport();
    backend.push_error(0x0502);

    font.generate(A..=Z).unwrap();
    assert_eq!(backend.current_program(), None);
    assert_eq!(backend.bound_framebuffer(), None);
    assert_eq!(backend.bound_vertex_array(), None);
    assert!(backend.bound_textures().is_empty());
    assert_eq!(backend.viewport(), viewport);
    // Pending GPU errors were logged and drained, not returned.
    assert_eq!(backend.take_error(), None);
}
