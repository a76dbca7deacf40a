//! OpenGL 3.3 core backend on top of glow.
//!
//! Apart from the explicit `bind_*` and `use_program` calls, every method
//! unbinds what it bound, so uploads during font creation do not leak state
//! into the host application's draws.

use glow::HasContext;
use tracing::warn;

use super::{
    AttributeKind, Backend, BufferUsage, DataFormat, Primitive, ShaderStage, UniformValue,
    VertexAttribute,
};

type Gl = glow::Context;

/// Backend driving a current OpenGL context.
pub struct GlowBackend {
    gl: Gl,
}

impl GlowBackend {
    /// Wrap a context that is current on this thread. Requires GL 3.3 core
    /// (geometry shaders, integer textures, float render targets).
    pub fn new(gl: Gl) -> Self {
        Self { gl }
    }

    pub fn gl(&self) -> &Gl {
        &self.gl
    }

    fn compile_stage(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<<Gl as HasContext>::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                Err(log)
            }
        }
    }
}

impl Backend for GlowBackend {
    type Program = <Gl as HasContext>::Program;
    type Buffer = <Gl as HasContext>::Buffer;
    type Texture = <Gl as HasContext>::Texture;
    type Framebuffer = <Gl as HasContext>::Framebuffer;
    type VertexArray = <Gl as HasContext>::VertexArray;
    type UniformLocation = <Gl as HasContext>::UniformLocation;

    fn compile_program(
        &self,
        label: &str,
        stages: &[(ShaderStage, &str)],
    ) -> Result<Self::Program, (Option<ShaderStage>, String)> {
        let mut shaders = Vec::with_capacity(stages.len());
        for &(stage, source) in stages {
            match self.compile_stage(stage, source) {
                Ok(shader) => shaders.push(shader),
                Err(log) => {
                    for shader in shaders {
                        unsafe { self.gl.delete_shader(shader) };
                    }
                    return Err((Some(stage), log));
                }
            }
        }

        unsafe {
            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(e) => {
                    for shader in shaders {
                        self.gl.delete_shader(shader);
                    }
                    return Err((None, format!("{label}: {e}")));
                }
            };
            for &shader in &shaders {
                self.gl.attach_shader(program, shader);
            }
            self.gl.link_program(program);
            for shader in shaders {
                self.gl.detach_shader(program, shader);
                self.gl.delete_shader(shader);
            }
            if self.gl.get_program_link_status(program) {
                Ok(program)
            } else {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                Err((None, log))
            }
        }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn set_uniform(&self, location: Option<&Self::UniformLocation>, value: UniformValue) {
        let Some(location) = location else { return };
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(Some(location), v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(location), v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(Some(location), v.x, v.y),
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(Some(location), false, &m.to_cols_array())
                }
            }
        }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn upload_buffer(&self, buffer: Self::Buffer, data: &[u8], usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsage::Stream => glow::STREAM_DRAW,
        };
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, usage);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn upload_data_texture(
        &self,
        texture: Self::Texture,
        format: DataFormat,
        width: u32,
        height: u32,
        data: &[u8],
    ) {
        let (internal, pixel_format, pixel_type) = match format {
            DataFormat::R8Ui => (glow::R8UI, glow::RED_INTEGER, glow::UNSIGNED_BYTE),
            DataFormat::R32F => (glow::R32F, glow::RED, glow::FLOAT),
        };
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            // Integer textures are incomplete with linear filtering or mips.
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                pixel_format,
                pixel_type,
                Some(data),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    fn allocate_atlas(&self, texture: Self::Texture, size: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA32F as i32,
                size as i32,
                size as i32,
                0,
                glow::RGBA,
                glow::FLOAT,
                None,
            );
            for (param, value) in [
                (glow::TEXTURE_MIN_FILTER, glow::LINEAR),
                (glow::TEXTURE_MAG_FILTER, glow::LINEAR),
                (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
            ] {
                self.gl
                    .tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
            }
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String> {
        unsafe { self.gl.create_framebuffer() }
    }

    fn attach_color_texture(
        &self,
        framebuffer: Self::Framebuffer,
        texture: Self::Texture,
    ) -> Result<(), u32> {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status == glow::FRAMEBUFFER_COMPLETE {
                Ok(())
            } else {
                Err(status)
            }
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) }
    }

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn set_vertex_layout(
        &self,
        vertex_array: Self::VertexArray,
        buffer: Self::Buffer,
        stride: i32,
        attributes: &[VertexAttribute],
    ) {
        unsafe {
            self.gl.bind_vertex_array(Some(vertex_array));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            for attr in attributes {
                self.gl.enable_vertex_attrib_array(attr.location);
                match attr.kind {
                    AttributeKind::Float => self.gl.vertex_attrib_pointer_f32(
                        attr.location,
                        attr.components,
                        glow::FLOAT,
                        false,
                        stride,
                        attr.offset,
                    ),
                    AttributeKind::NormalizedU8 => self.gl.vertex_attrib_pointer_f32(
                        attr.location,
                        attr.components,
                        glow::UNSIGNED_BYTE,
                        true,
                        stride,
                        attr.offset,
                    ),
                    AttributeKind::Int => self.gl.vertex_attrib_pointer_i32(
                        attr.location,
                        attr.components,
                        glow::INT,
                        stride,
                        attr.offset,
                    ),
                }
            }
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn viewport(&self) -> [i32; 4] {
        let mut viewport = [0i32; 4];
        unsafe {
            self.gl
                .get_parameter_i32_slice(glow::VIEWPORT, &mut viewport)
        };
        viewport
    }

    fn set_viewport(&self, [x, y, w, h]: [i32; 4]) {
        unsafe { self.gl.viewport(x, y, w, h) }
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32) {
        let mode = match primitive {
            Primitive::Triangles => glow::TRIANGLES,
            Primitive::Points => glow::POINTS,
        };
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn take_error(&self) -> Option<u32> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(code),
        }
    }

    fn max_texture_size(&self) -> u32 {
        let size = unsafe { self.gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE) };
        if size <= 0 {
            warn!("GL_MAX_TEXTURE_SIZE query returned {}", size);
            return 0;
        }
        size as u32
    }
}
