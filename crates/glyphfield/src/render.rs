//! Point-sprite text rendering.
//!
//! Each visible glyph is one vertex. The geometry stage looks the glyph up in
//! the index texture and emits a quad covering its padded footprint; the
//! fragment stage takes the channel median and anti-aliases with `fwidth`.
//! [`GlyphQuad::expand`] repeats the geometry stage's arithmetic on the CPU.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::Serialize;
use tracing::{trace, warn};

use crate::atlas::GlyphIndexEntry;
use crate::backend::{AttributeKind, Backend, BufferUsage, Primitive, UniformValue, VertexAttribute};
use crate::font::Font;
use crate::outline::OutlineSource;
use crate::projection::{orthographic, Mat4};
use crate::state::{drain_errors, BindingGuard};

/// One glyph to draw.
///
/// `x` is the pen position and `y` the baseline, in the units of the
/// projection passed to [`Font::render`]. `size` converts outline units to
/// those units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GlyphInstance {
    pub x: f32,
    pub y: f32,
    pub color: [u8; 4],
    pub glyph_id: u32,
    pub size: f32,
    /// Vertical shift of the baseline.
    pub offset: f32,
    /// Horizontal lean per unit of height above the baseline.
    pub skew: f32,
    /// Added to the median distance; positive values embolden.
    pub strength: f32,
}

impl GlyphInstance {
    pub fn new(glyph_id: u32, x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            color: [255; 4],
            glyph_id,
            size: 1.0,
            offset: 0.0,
            skew: 0.0,
            strength: 0.0,
        }
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_skew(mut self, skew: f32) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    fn styled(self, style: &TextStyle) -> Self {
        Self {
            color: style.color,
            size: style.size,
            offset: style.offset,
            skew: style.skew,
            strength: style.strength,
            ..self
        }
    }
}

/// Shared appearance for [`Font::layout_line`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: [u8; 4],
    pub offset: f32,
    pub skew: f32,
    pub strength: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 1.0,
            color: [255; 4],
            offset: 0.0,
            skew: 0.0,
            strength: 0.0,
        }
    }
}

/// Vertex layout of one render instance. Matches the attribute locations of
/// `render.vert`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct GpuGlyph {
    position: [f32; 2],
    color: [u8; 4],
    slot: i32,
    size: f32,
    offset: f32,
    skew: f32,
    strength: f32,
}

const fn attribute(location: u32, components: i32, kind: AttributeKind, offset: i32) -> VertexAttribute {
    VertexAttribute {
        location,
        components,
        kind,
        offset,
    }
}

impl GpuGlyph {
    pub(crate) const ATTRIBUTES: [VertexAttribute; 7] = [
        attribute(0, 2, AttributeKind::Float, 0),
        attribute(1, 4, AttributeKind::NormalizedU8, 8),
        attribute(2, 1, AttributeKind::Int, 12),
        attribute(3, 1, AttributeKind::Float, 16),
        attribute(4, 1, AttributeKind::Float, 20),
        attribute(5, 1, AttributeKind::Float, 24),
        attribute(6, 1, AttributeKind::Float, 28),
    ];

    fn new(instance: &GlyphInstance, slot: u32) -> Self {
        Self {
            position: [instance.x, instance.y],
            color: instance.color,
            slot: slot as i32,
            size: instance.size,
            offset: instance.offset,
            skew: instance.skew,
            strength: instance.strength,
        }
    }
}

/// Screen-space quad of one rendered glyph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GlyphQuad {
    pub glyph_id: u32,
    /// Top-left, top-right, bottom-left, bottom-right.
    pub corners: [[f32; 2]; 4],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

impl GlyphQuad {
    /// Expand an instance the way the geometry stage does. `padding` is half
    /// the distance range, in outline units.
    pub fn expand(
        entry: &GlyphIndexEntry,
        instance: &GlyphInstance,
        padding: f32,
        texture_size: u32,
    ) -> Self {
        let size = instance.size;
        let baseline = instance.y + instance.offset;
        let left = instance.x + (entry.bearing_x - padding) * size;
        let right = left + (entry.glyph_width + 2.0 * padding) * size;
        let top = baseline - (entry.bearing_y + padding) * size;
        let bottom = top + (entry.glyph_height + 2.0 * padding) * size;
        let lean_top = instance.skew * (baseline - top);
        let lean_bottom = instance.skew * (baseline - bottom);

        let side = texture_size as f32;
        Self {
            glyph_id: instance.glyph_id,
            corners: [
                [left + lean_top, top],
                [right + lean_top, top],
                [left + lean_bottom, bottom],
                [right + lean_bottom, bottom],
            ],
            uv_min: [entry.atlas_x / side, entry.atlas_y / side],
            uv_max: [
                (entry.atlas_x + entry.footprint_w) / side,
                (entry.atlas_y + entry.footprint_h) / side,
            ],
        }
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> ([f32; 2], [f32; 2]) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min = [min[0].min(c[0]), min[1].min(c[1])];
            max = [max[0].max(c[0]), max[1].max(c[1])];
        }
        (min, max)
    }
}

impl<B: Backend, O: OutlineSource> Font<'_, B, O> {
    /// Draw a batch of glyphs with one point draw call.
    ///
    /// Instances whose glyph was never generated are skipped. GPU errors are
    /// logged, never returned.
    pub fn render(&self, instances: &[GlyphInstance], projection: &Mat4) {
        let mut skipped = 0;
        let batch: Vec<GpuGlyph> = instances
            .iter()
            .filter_map(|instance| match self.slots.get(&instance.glyph_id) {
                Some(&slot) => Some(GpuGlyph::new(instance, slot)),
                None => {
                    trace!("Glyph {} not generated, skipping", instance.glyph_id);
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            warn!("Skipped {} of {} glyph instances with no atlas entry", skipped, instances.len());
        }
        if batch.is_empty() {
            return;
        }

        let backend = &**self.context.backend();
        let program = self.context.renderer();
        let res = &self.resources;
        let side = self.texture_size as f32;

        let _guard = BindingGuard::new(backend, 2);
        backend.upload_buffer(
            res.instance_buffer.handle(),
            bytemuck::cast_slice(&batch),
            BufferUsage::Dynamic,
        );
        backend.use_program(Some(program.handle()));
        program.projection.set(backend, UniformValue::Mat4(*projection));
        program.font_projection.set(
            backend,
            UniformValue::Mat4(orthographic(-side, side, -side, side)),
        );
        program
            .padding
            .set(backend, UniformValue::Float(self.range / 2.0));
        program.offset.set(backend, UniformValue::Vec2(Vec2::ZERO));
        program.font_atlas.set(backend, UniformValue::Int(0));
        program.font_index.set(backend, UniformValue::Int(1));
        backend.bind_texture(0, Some(res.atlas.handle()));
        backend.bind_texture(1, Some(res.index.handle()));
        backend.bind_vertex_array(Some(res.instance_vao.handle()));
        backend.draw_arrays(Primitive::Points, 0, batch.len() as i32);

        drain_errors(backend, "text rendering");
    }

    /// Screen quads the renderer would emit for `instances`. Ungenerated
    /// glyphs are left out.
    pub fn quads(&self, instances: &[GlyphInstance]) -> Vec<GlyphQuad> {
        let padding = self.range / 2.0;
        instances
            .iter()
            .filter_map(|instance| {
                self.entry(instance.glyph_id)
                    .map(|entry| GlyphQuad::expand(entry, instance, padding, self.texture_size))
            })
            .collect()
    }

    /// Lay out `text` starting with the pen at `(x, y)`.
    ///
    /// Glyph ids are code points. A newline returns the pen to `x` and moves
    /// it down one line; characters that were never generated are skipped
    /// without advancing.
    pub fn layout_line(&self, text: &str, x: f32, y: f32, style: &TextStyle) -> Vec<GlyphInstance> {
        let mut pen = (x, y);
        let mut instances = Vec::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '\n' {
                pen = (x, pen.1 + self.vertical_advance * style.size);
                continue;
            }
            let glyph_id = ch as u32;
            let Some(advance) = self.horizontal_advance(glyph_id) else {
                trace!("No advance for U+{:04X}, skipping", glyph_id);
                continue;
            };
            instances.push(GlyphInstance::new(glyph_id, pen.0, pen.1).styled(style));
            pen.0 += advance * style.size;
        }
        instances
    }
}
