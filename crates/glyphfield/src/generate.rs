//! Glyph generation: plan on the CPU, commit, then draw into the atlas.
//!
//! A batch is planned against a clone of the packer. Outline failures,
//! duplicates and capacity errors all surface before the font changes, so a
//! failed batch leaves advances, index and cursor exactly as they were.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use glam::Vec2;
use tracing::{debug, trace};

use crate::atlas::{Footprint, GlyphIndexEntry, ShelfPacker};
use crate::backend::{Backend, BufferUsage, DataFormat, Primitive, UniformValue};
use crate::error::{Error, Result};
use crate::font::{upload_stream, Font};
use crate::outline::{OutlineError, OutlineSource, POINT_BYTES};
use crate::projection::orthographic;
use crate::shaders::DATA_ROW;
use crate::state::{drain_errors, BindingGuard};

struct PlannedGlyph {
    glyph_id: u32,
    entry: GlyphIndexEntry,
    advance: f32,
    /// Byte offset into the batch meta stream.
    meta_offset: usize,
    /// Point offset into the batch point stream.
    point_offset: usize,
}

struct BatchPlan {
    glyphs: Vec<PlannedGlyph>,
    meta: Vec<u8>,
    points: Vec<u8>,
    packer: ShelfPacker,
}

fn check_texels(what: &'static str, texels: usize, limit: usize) -> Result<()> {
    if texels > limit {
        return Err(Error::DataTooLarge {
            what,
            texels,
            limit,
        });
    }
    Ok(())
}

impl<B: Backend, O: OutlineSource> Font<'_, B, O> {
    /// Generate every glyph id in `range`. Returns how many were generated.
    pub fn generate(&mut self, range: RangeInclusive<u32>) -> Result<usize> {
        let (first, last) = (*range.start(), *range.end());
        if first > last {
            return Err(Error::InvalidRange { first, last });
        }
        self.check_batch_len(u64::from(last - first) + 1)?;
        let ids: Vec<u32> = range.collect();
        self.generate_batch(&ids)
    }

    pub fn generate_glyph(&mut self, glyph_id: u32) -> Result<()> {
        self.generate_batch(&[glyph_id]).map(|_| ())
    }

    /// Generate an arbitrary set of ids, packed in the order given.
    pub fn generate_list(&mut self, glyph_ids: &[u32]) -> Result<usize> {
        if glyph_ids.is_empty() {
            return Err(Error::EmptyBatch);
        }
        self.check_batch_len(glyph_ids.len() as u64)?;
        self.generate_batch(glyph_ids)
    }

    /// Code points `0..=127`.
    pub fn generate_ascii(&mut self) -> Result<usize> {
        self.generate(0..=127)
    }

    /// Code points `0..=255`: ASCII plus Latin-1.
    pub fn generate_ascii_ext(&mut self) -> Result<usize> {
        self.generate(0..=255)
    }

    /// Reject batches that could not fit even if every glyph were empty,
    /// before anything is allocated for them.
    fn check_batch_len(&self, requested: u64) -> Result<()> {
        let index_limit = (DATA_ROW as u64 * u64::from(self.context.backend().max_texture_size()))
            / GlyphIndexEntry::FLOATS as u64;
        let index_room = index_limit.saturating_sub(self.entries.len() as u64);
        let capacity = self
            .packer
            .remaining_capacity(self.range * self.scale)
            .min(index_room);
        if requested > capacity {
            debug!(
                "Rejecting batch of {} glyphs, at most {} more fit",
                requested, capacity
            );
            return Err(Error::BatchTooLarge {
                requested,
                capacity,
            });
        }
        Ok(())
    }

    fn generate_batch(&mut self, ids: &[u32]) -> Result<usize> {
        let plan = self.plan(ids)?;
        let BatchPlan {
            glyphs,
            meta,
            points,
            packer,
        } = plan;

        self.packer = packer;
        for glyph in &glyphs {
            self.slots.insert(glyph.glyph_id, self.entries.len() as u32);
            self.entries.push(glyph.entry);
            self.horizontal_advances.insert(glyph.glyph_id, glyph.advance);
        }

        self.draw_batch(&glyphs, &meta, &points);
        debug!(
            "Generated {} glyphs ({} meta bytes, {} point bytes), atlas at {:.1}%",
            glyphs.len(),
            meta.len(),
            points.len(),
            self.packer.stats().utilization * 100.0
        );
        Ok(glyphs.len())
    }

    fn plan(&self, ids: &[u32]) -> Result<BatchPlan> {
        let mut seen = HashSet::with_capacity(ids.len());
        for &glyph_id in ids {
            if self.slots.contains_key(&glyph_id) || !seen.insert(glyph_id) {
                return Err(Error::AlreadyGenerated { glyph_id });
            }
        }

        let limit = DATA_ROW * self.context.backend().max_texture_size() as usize;
        check_texels(
            "index",
            (self.entries.len() + ids.len()) * GlyphIndexEntry::FLOATS,
            limit,
        )?;

        // Size then fill one glyph at a time, so an outline source only has
        // to keep the glyph it just measured.
        let mut meta = Vec::new();
        let mut points = Vec::new();
        let mut packer = self.packer.clone();
        let mut glyphs = Vec::with_capacity(ids.len());
        for &glyph_id in ids {
            let outline_err = |source: OutlineError| Error::Outline { glyph_id, source };
            let size = self.outlines.buffer_sizes(glyph_id).map_err(outline_err)?;
            let (m, p) = (meta.len(), points.len());
            check_texels("meta", (m + size.meta) / DataFormat::R8Ui.texel_bytes(), limit)?;
            check_texels(
                "point",
                (p + size.points) / DataFormat::R32F.texel_bytes(),
                limit,
            )?;
            meta.resize(m + size.meta, 0);
            points.resize(p + size.points, 0);
            let metrics = self
                .outlines
                .serialize(glyph_id, &mut meta[m..], &mut points[p..])
                .map_err(outline_err)?;

            let footprint = Footprint::for_glyph(&metrics, self.range, self.scale);
            let placement = packer.place(footprint).map_err(|reason| {
                debug!("Glyph {} rejected by packer: {:?}", glyph_id, reason);
                Error::AtlasFull {
                    glyph_id,
                    width: footprint.width,
                    height: footprint.height,
                    texture_size: self.texture_size,
                }
            })?;

            glyphs.push(PlannedGlyph {
                glyph_id,
                entry: GlyphIndexEntry::new(placement, footprint, &metrics),
                advance: metrics.advance,
                meta_offset: m,
                point_offset: p / POINT_BYTES,
            });
        }

        Ok(BatchPlan {
            glyphs,
            meta,
            points,
            packer,
        })
    }

    fn draw_batch(&self, glyphs: &[PlannedGlyph], meta: &[u8], points: &[u8]) {
        let backend = &**self.context.backend();
        let program = self.context.generator();
        let res = &self.resources;
        let side = self.texture_size as f32;
        let half_range = self.range / 2.0;

        let _guard = BindingGuard::new(backend, 2);
        upload_stream(backend, res.meta.handle(), DataFormat::R8Ui, meta);
        upload_stream(backend, res.points.handle(), DataFormat::R32F, points);
        upload_stream(
            backend,
            res.index.handle(),
            DataFormat::R32F,
            bytemuck::cast_slice(&self.entries),
        );

        backend.bind_framebuffer(Some(res.framebuffer.handle()));
        backend.set_viewport([0, 0, self.texture_size as i32, self.texture_size as i32]);
        backend.use_program(Some(program.handle()));
        program.projection.set(
            backend,
            UniformValue::Mat4(orthographic(0.0, side, 0.0, side)),
        );
        program
            .scale
            .set(backend, UniformValue::Vec2(Vec2::splat(self.scale)));
        program.range.set(backend, UniformValue::Float(self.range));
        program.metadata.set(backend, UniformValue::Int(0));
        program.point_data.set(backend, UniformValue::Int(1));
        backend.bind_texture(0, Some(res.meta.handle()));
        backend.bind_texture(1, Some(res.points.handle()));
        backend.bind_vertex_array(Some(res.quad_vao.handle()));

        for glyph in glyphs {
            let e = &glyph.entry;
            let (w, h) = (e.footprint_w, e.footprint_h);
            let quad: [f32; 12] = [0.0, 0.0, w, 0.0, 0.0, h, 0.0, h, w, 0.0, w, h];
            backend.upload_buffer(
                res.quad_buffer.handle(),
                bytemuck::cast_slice(&quad),
                BufferUsage::Stream,
            );

            program.translate.set(
                backend,
                UniformValue::Vec2(Vec2::new(
                    -e.bearing_x + half_range,
                    e.glyph_height - e.bearing_y + half_range,
                )),
            );
            program
                .offset
                .set(backend, UniformValue::Vec2(Vec2::new(e.atlas_x, e.atlas_y)));
            program
                .meta_offset
                .set(backend, UniformValue::Int(glyph.meta_offset as i32));
            program
                .point_offset
                .set(backend, UniformValue::Int(glyph.point_offset as i32));
            program
                .glyph_height
                .set(backend, UniformValue::Float(e.footprint_h));
            backend.draw_arrays(Primitive::Triangles, 0, 6);
            trace!(
                "Drew glyph {} at ({}, {}) {}x{}",
                glyph.glyph_id,
                e.atlas_x,
                e.atlas_y,
                w,
                h
            );
        }

        drain_errors(backend, "glyph generation");
    }
}
