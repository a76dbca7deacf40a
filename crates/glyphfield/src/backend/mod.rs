//! Graphics backend abstraction.
//!
//! The pipelines need a small, GL-shaped capability set: programs with named
//! uniforms, vertex buffers, 2D textures (the RGBA32F atlas plus integer and
//! float data textures holding serialized outlines), framebuffers, and point
//! or triangle draws. Everything takes `&self` and runs on the thread owning
//! the graphics context.
//!
//! ```text
//! Context / Font ──► Owned<B, K> guards ──► Backend
//!                                             ├── GlowBackend       (OpenGL 3.3 core)
//!                                             └── RecordingBackend  (headless, tests + CLI)
//! ```

#[cfg(feature = "glow")]
mod gl;
mod recording;
mod resource;

#[cfg(feature = "glow")]
pub use gl::GlowBackend;
pub use recording::{Call, ObjectId, RecordedLocation, RecordingBackend, TextureData};
pub use resource::{
    BufferKind, FramebufferKind, Owned, OwnedBuffer, OwnedFramebuffer, OwnedProgram,
    OwnedTexture, OwnedVertexArray, ProgramKind, Resource, TextureKind, VertexArrayKind,
};

use std::fmt;

use glam::{Mat4, Vec2};

/// Programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Texel format of a data texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    /// One unsigned byte per texel, read with a `usampler2D`.
    R8Ui,
    /// One f32 per texel, read with a `sampler2D`.
    R32F,
}

impl DataFormat {
    pub fn texel_bytes(self) -> usize {
        match self {
            DataFormat::R8Ui => 1,
            DataFormat::R32F => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Points,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Static,
    Dynamic,
    Stream,
}

/// Uniform payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Mat4(Mat4),
}

/// How one vertex attribute is fetched from the bound buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub kind: AttributeKind,
    pub offset: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Float,
    /// Unsigned bytes mapped to `[0, 1]`.
    NormalizedU8,
    /// Passed to the shader as `int`.
    Int,
}

/// GL-shaped backend.
///
/// Handles are plain values; ownership is tracked by [`Owned`] guards, not by
/// the backend.
pub trait Backend {
    type Program: Copy + fmt::Debug;
    type Buffer: Copy + fmt::Debug;
    type Texture: Copy + fmt::Debug;
    type Framebuffer: Copy + fmt::Debug;
    type VertexArray: Copy + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;

    /// Compile and link a program. `Err` carries the failing stage (or `None`
    /// for link failures) and its info log.
    fn compile_program(
        &self,
        label: &str,
        stages: &[(ShaderStage, &str)],
    ) -> Result<Self::Program, (Option<ShaderStage>, String)>;
    fn delete_program(&self, program: Self::Program);
    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn use_program(&self, program: Option<Self::Program>);
    /// Set a uniform on the program in use. A `None` location is ignored.
    fn set_uniform(&self, location: Option<&Self::UniformLocation>, value: UniformValue);

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Replace the contents of a vertex buffer.
    fn upload_buffer(&self, buffer: Self::Buffer, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// (Re)define a data texture as `width x height` texels of `format`.
    /// `data` holds exactly `width * height` texels.
    fn upload_data_texture(
        &self,
        texture: Self::Texture,
        format: DataFormat,
        width: u32,
        height: u32,
        data: &[u8],
    );
    /// Allocate uninitialized RGBA32F storage with linear filtering and
    /// clamp-to-edge wrapping.
    fn allocate_atlas(&self, texture: Self::Texture, size: u32);
    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>);
    fn delete_texture(&self, texture: Self::Texture);

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String>;
    /// Attach `texture` as color 0. Returns `Err(status)` if the framebuffer
    /// is incomplete afterwards.
    fn attach_color_texture(
        &self,
        framebuffer: Self::Framebuffer,
        texture: Self::Texture,
    ) -> Result<(), u32>;
    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);
    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    /// Record the attribute layout of `buffer` into `vertex_array`.
    fn set_vertex_layout(
        &self,
        vertex_array: Self::VertexArray,
        buffer: Self::Buffer,
        stride: i32,
        attributes: &[VertexAttribute],
    );
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    fn viewport(&self) -> [i32; 4];
    fn set_viewport(&self, viewport: [i32; 4]);
    fn clear_color(&self, rgba: [f32; 4]);
    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32);

    /// Pop the oldest pending error code, if any.
    fn take_error(&self) -> Option<u32>;
    fn max_texture_size(&self) -> u32;
}
