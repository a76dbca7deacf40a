//! A font: one atlas, its index, and the GPU objects both pipelines use.
//!
//! ```text
//! Font<'ctx, B, O>
//! ├── outlines           O: OutlineSource
//! ├── packer             ShelfPacker (cursor persists across batches)
//! ├── entries / slots    GlyphIndexEntry per generated glyph, id -> slot
//! └── resources
//!     ├── atlas + framebuffer     RGBA32F, T x T
//!     ├── meta / points           per-batch outline streams
//!     ├── index                   every entry, 8 floats each
//!     ├── quad buffer + VAO       generator
//!     └── instance buffer + VAO   renderer
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use tracing::info;

use crate::atlas::{AtlasStats, GlyphIndexEntry, ShelfPacker};
use crate::backend::{
    AttributeKind, Backend, DataFormat, OwnedBuffer, OwnedFramebuffer, OwnedTexture,
    OwnedVertexArray, VertexAttribute,
};
use crate::config::{FontConfig, FontParams};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::outline::{OutlineSource, TtfOutlines};
use crate::render::GpuGlyph;
use crate::shaders::DATA_ROW;
use crate::state::BindingGuard;

/// GPU objects owned by one font. Dropping releases all of them.
pub(crate) struct FontResources<B: Backend> {
    pub framebuffer: OwnedFramebuffer<B>,
    pub atlas: OwnedTexture<B>,
    pub meta: OwnedTexture<B>,
    pub points: OwnedTexture<B>,
    pub index: OwnedTexture<B>,
    pub quad_buffer: OwnedBuffer<B>,
    pub quad_vao: OwnedVertexArray<B>,
    pub instance_buffer: OwnedBuffer<B>,
    pub instance_vao: OwnedVertexArray<B>,
}

impl<B: Backend> FontResources<B> {
    fn create(backend: &Rc<B>, texture_size: u32) -> Result<Self> {
        let atlas = OwnedTexture::create(backend)?;
        backend.allocate_atlas(atlas.handle(), texture_size);

        let framebuffer = OwnedFramebuffer::create(backend)?;
        backend
            .attach_color_texture(framebuffer.handle(), atlas.handle())
            .map_err(|status| Error::IncompleteFramebuffer { status })?;
        {
            let _guard = BindingGuard::new(&**backend, 0);
            let side = texture_size as i32;
            backend.bind_framebuffer(Some(framebuffer.handle()));
            backend.set_viewport([0, 0, side, side]);
            backend.clear_color([0.0; 4]);
        }

        let meta = empty_data_texture(backend, DataFormat::R8Ui)?;
        let points = empty_data_texture(backend, DataFormat::R32F)?;
        let index = empty_data_texture(backend, DataFormat::R32F)?;

        let quad_buffer = OwnedBuffer::create(backend)?;
        let quad_vao = OwnedVertexArray::create(backend)?;
        backend.set_vertex_layout(
            quad_vao.handle(),
            quad_buffer.handle(),
            (2 * std::mem::size_of::<f32>()) as i32,
            &[VertexAttribute {
                location: 0,
                components: 2,
                kind: AttributeKind::Float,
                offset: 0,
            }],
        );

        let instance_buffer = OwnedBuffer::create(backend)?;
        let instance_vao = OwnedVertexArray::create(backend)?;
        backend.set_vertex_layout(
            instance_vao.handle(),
            instance_buffer.handle(),
            std::mem::size_of::<GpuGlyph>() as i32,
            &GpuGlyph::ATTRIBUTES,
        );

        Ok(Self {
            framebuffer,
            atlas,
            meta,
            points,
            index,
            quad_buffer,
            quad_vao,
            instance_buffer,
            instance_vao,
        })
    }
}

fn empty_data_texture<B: Backend>(backend: &Rc<B>, format: DataFormat) -> Result<OwnedTexture<B>> {
    let texture = OwnedTexture::create(backend)?;
    upload_stream(&**backend, texture.handle(), format, &[]);
    Ok(texture)
}

/// Upload a byte stream as a row-wrapped data texture, zero-padding the last
/// row. An empty stream still gets one row so the sampler stays complete.
pub(crate) fn upload_stream<B: Backend>(
    backend: &B,
    texture: B::Texture,
    format: DataFormat,
    bytes: &[u8],
) {
    let texel = format.texel_bytes();
    let texels = bytes.len() / texel;
    let rows = texels.div_ceil(DATA_ROW).max(1);
    let mut padded = Vec::with_capacity(rows * DATA_ROW * texel);
    padded.extend_from_slice(bytes);
    padded.resize(rows * DATA_ROW * texel, 0);
    backend.upload_data_texture(texture, format, DATA_ROW as u32, rows as u32, &padded);
}

/// A generated MSDF font.
///
/// Borrows the [`Context`] it was built from; the context cannot be dropped
/// while the font is alive.
pub struct Font<'ctx, B: Backend, O: OutlineSource> {
    pub(crate) context: &'ctx Context<B>,
    pub(crate) outlines: O,
    pub(crate) range: f32,
    pub(crate) scale: f32,
    pub(crate) texture_size: u32,
    pub(crate) vertical_advance: f32,
    pub(crate) horizontal_advances: HashMap<u32, f32>,
    pub(crate) entries: Vec<GlyphIndexEntry>,
    pub(crate) slots: HashMap<u32, u32>,
    pub(crate) packer: ShelfPacker,
    pub(crate) resources: FontResources<B>,
}

impl<'ctx, B: Backend, O: OutlineSource> Font<'ctx, B, O> {
    /// Create an empty font over `outlines`. No glyphs are generated yet.
    pub fn new(context: &'ctx Context<B>, outlines: O, params: FontParams) -> Result<Self> {
        let backend = context.backend();
        params.validate(backend.max_texture_size())?;
        let resources = FontResources::create(backend, params.texture_size)?;
        let vertical_advance = outlines.vertical_advance();
        info!(
            "Created font: {}px atlas, range {}, scale {}",
            params.texture_size, params.range, params.scale
        );
        Ok(Self {
            context,
            outlines,
            range: params.range,
            scale: params.scale,
            texture_size: params.texture_size,
            vertical_advance,
            horizontal_advances: HashMap::new(),
            entries: Vec::new(),
            slots: HashMap::new(),
            packer: ShelfPacker::new(params.texture_size),
            resources,
        })
    }

    pub fn vertical_advance(&self) -> f32 {
        self.vertical_advance
    }

    /// Pen advance of a generated glyph, in outline units.
    pub fn horizontal_advance(&self, glyph_id: u32) -> Option<f32> {
        self.horizontal_advances.get(&glyph_id).copied()
    }

    pub fn horizontal_advances(&self) -> &HashMap<u32, f32> {
        &self.horizontal_advances
    }

    pub fn entry(&self, glyph_id: u32) -> Option<&GlyphIndexEntry> {
        self.slots
            .get(&glyph_id)
            .and_then(|&slot| self.entries.get(slot as usize))
    }

    /// Index entries in slot order.
    pub fn entries(&self) -> &[GlyphIndexEntry] {
        &self.entries
    }

    /// Generated glyph ids with their entries, in slot order.
    pub fn glyphs(&self) -> Vec<(u32, GlyphIndexEntry)> {
        let mut glyphs: Vec<(u32, u32)> = self.slots.iter().map(|(&id, &slot)| (id, slot)).collect();
        glyphs.sort_by_key(|&(_, slot)| slot);
        glyphs
            .into_iter()
            .map(|(id, slot)| (id, self.entries[slot as usize]))
            .collect()
    }

    pub fn atlas_stats(&self) -> AtlasStats {
        self.packer.stats()
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    pub fn outlines(&self) -> &O {
        &self.outlines
    }

    /// Atlas texture handle, for callers sampling the field directly.
    pub fn atlas(&self) -> B::Texture {
        self.resources.atlas.handle()
    }

    /// Index texture handle.
    pub fn index_texture(&self) -> B::Texture {
        self.resources.index.handle()
    }

    /// Release every GPU object. Equivalent to dropping the font.
    pub fn destroy(self) {
        info!("Destroyed font with {} glyphs", self.entries.len());
    }
}

impl<'ctx, B: Backend> Font<'ctx, B, TtfOutlines> {
    /// Open the font file named by `config` and create an empty font over it.
    pub fn load(context: &'ctx Context<B>, config: &FontConfig) -> Result<Self> {
        config.validate(context.backend().max_texture_size())?;
        let outlines = TtfOutlines::open(&config.font_source, config.face_index, config.em_size)
            .map_err(Error::FontLoad)?;
        Self::new(context, outlines, config.params())
    }
}
