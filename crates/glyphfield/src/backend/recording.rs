//! Headless backend that records every call.
//!
//! Programs "compile" by scanning their `uniform` declarations, so uniform
//! lookups resolve exactly the names the shader sources declare. Uploaded
//! bytes are kept so tests and the CLI can inspect what would have reached
//! the GPU.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use super::{
    Backend, BufferUsage, DataFormat, Primitive, ShaderStage, UniformValue, VertexAttribute,
};

/// Handle for every object kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordedLocation {
    pub program: ObjectId,
    pub name: String,
}

/// One recorded backend call. Object creation is not recorded; deletion is.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CompileProgram {
        label: String,
        program: ObjectId,
    },
    UseProgram(Option<ObjectId>),
    SetUniform {
        name: String,
        value: UniformValue,
    },
    UploadBuffer {
        buffer: ObjectId,
        len: usize,
        usage: BufferUsage,
    },
    UploadDataTexture {
        texture: ObjectId,
        format: DataFormat,
        width: u32,
        height: u32,
    },
    AllocateAtlas {
        texture: ObjectId,
        size: u32,
    },
    AttachColor {
        framebuffer: ObjectId,
        texture: ObjectId,
    },
    BindTexture {
        unit: u32,
        texture: Option<ObjectId>,
    },
    BindFramebuffer(Option<ObjectId>),
    BindVertexArray(Option<ObjectId>),
    SetVertexLayout {
        vertex_array: ObjectId,
        buffer: ObjectId,
        stride: i32,
        attributes: Vec<VertexAttribute>,
    },
    SetViewport([i32; 4]),
    Clear([f32; 4]),
    Draw {
        primitive: Primitive,
        first: i32,
        count: i32,
    },
    Delete {
        kind: &'static str,
        id: ObjectId,
    },
}

/// Contents of a recorded texture.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    /// `None` for atlas storage.
    pub format: Option<DataFormat>,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
enum Object {
    Program { uniforms: Vec<String> },
    Buffer(Vec<u8>),
    Texture(Option<TextureData>),
    Framebuffer,
    VertexArray,
}

impl Object {
    fn kind(&self) -> &'static str {
        match self {
            Object::Program { .. } => "program",
            Object::Buffer(_) => "buffer",
            Object::Texture(_) => "texture",
            Object::Framebuffer => "framebuffer",
            Object::VertexArray => "vertex array",
        }
    }
}

#[derive(Debug, Default)]
struct Bindings {
    program: Option<ObjectId>,
    framebuffer: Option<ObjectId>,
    vertex_array: Option<ObjectId>,
    textures: BTreeMap<u32, ObjectId>,
}

#[derive(Debug)]
pub struct RecordingBackend {
    next_id: Cell<u32>,
    calls: RefCell<Vec<Call>>,
    objects: RefCell<HashMap<ObjectId, Object>>,
    bindings: RefCell<Bindings>,
    viewport: Cell<[i32; 4]>,
    errors: RefCell<VecDeque<u32>>,
    fail_stage: Cell<Option<ShaderStage>>,
    fail_link: Cell<bool>,
    max_texture_size: u32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_max_texture_size(8192)
    }

    pub fn with_max_texture_size(max_texture_size: u32) -> Self {
        Self {
            next_id: Cell::new(1),
            calls: RefCell::new(Vec::new()),
            objects: RefCell::new(HashMap::new()),
            bindings: RefCell::new(Bindings::default()),
            viewport: Cell::new([0, 0, 800, 600]),
            errors: RefCell::new(VecDeque::new()),
            fail_stage: Cell::new(None),
            fail_link: Cell::new(false),
            max_texture_size,
        }
    }

    /// Make the next compile of `stage` fail.
    pub fn fail_stage(&self, stage: ShaderStage) {
        self.fail_stage.set(Some(stage));
    }

    /// Make the next link fail.
    pub fn fail_link(&self) {
        self.fail_link.set(true);
    }

    /// Queue an error code for [`Backend::take_error`].
    pub fn push_error(&self, code: u32) {
        self.errors.borrow_mut().push_back(code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn draws(&self) -> Vec<(Primitive, i32, i32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match *call {
                Call::Draw {
                    primitive,
                    first,
                    count,
                } => Some((primitive, first, count)),
                _ => None,
            })
            .collect()
    }

    /// Every value set for the uniform `name`, in call order.
    pub fn uniform_values(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::SetUniform { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Uniform names a program declares.
    pub fn program_uniforms(&self, program: ObjectId) -> Vec<String> {
        match self.objects.borrow().get(&program) {
            Some(Object::Program { uniforms }) => uniforms.clone(),
            _ => Vec::new(),
        }
    }

    pub fn buffer_data(&self, buffer: ObjectId) -> Option<Vec<u8>> {
        match self.objects.borrow().get(&buffer) {
            Some(Object::Buffer(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn texture_data(&self, texture: ObjectId) -> Option<TextureData> {
        match self.objects.borrow().get(&texture) {
            Some(Object::Texture(data)) => data.clone(),
            _ => None,
        }
    }

    pub fn current_program(&self) -> Option<ObjectId> {
        self.bindings.borrow().program
    }

    pub fn bound_framebuffer(&self) -> Option<ObjectId> {
        self.bindings.borrow().framebuffer
    }

    pub fn bound_vertex_array(&self) -> Option<ObjectId> {
        self.bindings.borrow().vertex_array
    }

    /// Texture units with something bound.
    pub fn bound_textures(&self) -> Vec<(u32, ObjectId)> {
        self.bindings
            .borrow()
            .textures
            .iter()
            .map(|(&unit, &id)| (unit, id))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn create(&self, object: Object) -> ObjectId {
        let id = ObjectId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.objects.borrow_mut().insert(id, object);
        id
    }

    fn delete(&self, id: ObjectId) {
        if let Some(object) = self.objects.borrow_mut().remove(&id) {
            self.record(Call::Delete {
                kind: object.kind(),
                id,
            });
        }
    }
}

/// Names declared as `uniform <type> <name>;`, in source order.
fn declared_uniforms(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let mut words = line.trim().strip_prefix("uniform ")?.split_whitespace();
            let _ty = words.next()?;
            let name = words.next()?.trim_end_matches(';');
            let name = name.split('[').next().unwrap_or(name);
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

impl Backend for RecordingBackend {
    type Program = ObjectId;
    type Buffer = ObjectId;
    type Texture = ObjectId;
    type Framebuffer = ObjectId;
    type VertexArray = ObjectId;
    type UniformLocation = RecordedLocation;

    fn compile_program(
        &self,
        label: &str,
        stages: &[(ShaderStage, &str)],
    ) -> Result<ObjectId, (Option<ShaderStage>, String)> {
        let mut uniforms = Vec::new();
        for &(stage, source) in stages {
            if self.fail_stage.get() == Some(stage) {
                self.fail_stage.set(None);
                return Err((Some(stage), format!("0:1(1): error: {stage} stage rejected")));
            }
            if !source.trim_start().starts_with("#version") || !source.contains("void main") {
                return Err((
                    Some(stage),
                    "0:1(1): error: missing #version or main()".to_string(),
                ));
            }
            for name in declared_uniforms(source) {
                if !uniforms.contains(&name) {
                    uniforms.push(name);
                }
            }
        }
        if self.fail_link.replace(false) {
            return Err((None, "error: linking failed".to_string()));
        }
        let program = self.create(Object::Program { uniforms });
        self.record(Call::CompileProgram {
            label: label.to_string(),
            program,
        });
        Ok(program)
    }

    fn delete_program(&self, program: ObjectId) {
        self.delete(program);
    }

    fn uniform_location(&self, program: ObjectId, name: &str) -> Option<RecordedLocation> {
        self.program_uniforms(program)
            .iter()
            .any(|u| u == name)
            .then(|| RecordedLocation {
                program,
                name: name.to_string(),
            })
    }

    fn use_program(&self, program: Option<ObjectId>) {
        self.bindings.borrow_mut().program = program;
        self.record(Call::UseProgram(program));
    }

    fn set_uniform(&self, location: Option<&RecordedLocation>, value: UniformValue) {
        if let Some(location) = location {
            self.record(Call::SetUniform {
                name: location.name.clone(),
                value,
            });
        }
    }

    fn create_buffer(&self) -> Result<ObjectId, String> {
        Ok(self.create(Object::Buffer(Vec::new())))
    }

    fn upload_buffer(&self, buffer: ObjectId, data: &[u8], usage: BufferUsage) {
        if let Some(Object::Buffer(stored)) = self.objects.borrow_mut().get_mut(&buffer) {
            *stored = data.to_vec();
        }
        self.record(Call::UploadBuffer {
            buffer,
            len: data.len(),
            usage,
        });
    }

    fn delete_buffer(&self, buffer: ObjectId) {
        self.delete(buffer);
    }

    fn create_texture(&self) -> Result<ObjectId, String> {
        Ok(self.create(Object::Texture(None)))
    }

    fn upload_data_texture(
        &self,
        texture: ObjectId,
        format: DataFormat,
        width: u32,
        height: u32,
        data: &[u8],
    ) {
        if let Some(Object::Texture(stored)) = self.objects.borrow_mut().get_mut(&texture) {
            *stored = Some(TextureData {
                format: Some(format),
                width,
                height,
                bytes: data.to_vec(),
            });
        }
        self.record(Call::UploadDataTexture {
            texture,
            format,
            width,
            height,
        });
    }

    fn allocate_atlas(&self, texture: ObjectId, size: u32) {
        if let Some(Object::Texture(stored)) = self.objects.borrow_mut().get_mut(&texture) {
            *stored = Some(TextureData {
                format: None,
                width: size,
                height: size,
                bytes: Vec::new(),
            });
        }
        self.record(Call::AllocateAtlas { texture, size });
    }

    fn bind_texture(&self, unit: u32, texture: Option<ObjectId>) {
        {
            let mut bindings = self.bindings.borrow_mut();
            match texture {
                Some(id) => bindings.textures.insert(unit, id),
                None => bindings.textures.remove(&unit),
            };
        }
        self.record(Call::BindTexture { unit, texture });
    }

    fn delete_texture(&self, texture: ObjectId) {
        self.delete(texture);
    }

    fn create_framebuffer(&self) -> Result<ObjectId, String> {
        Ok(self.create(Object::Framebuffer))
    }

    fn attach_color_texture(&self, framebuffer: ObjectId, texture: ObjectId) -> Result<(), u32> {
        self.record(Call::AttachColor {
            framebuffer,
            texture,
        });
        match self.objects.borrow().get(&texture) {
            Some(Object::Texture(Some(_))) => Ok(()),
            // GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            _ => Err(0x8CD6),
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<ObjectId>) {
        self.bindings.borrow_mut().framebuffer = framebuffer;
        self.record(Call::BindFramebuffer(framebuffer));
    }

    fn delete_framebuffer(&self, framebuffer: ObjectId) {
        self.delete(framebuffer);
    }

    fn create_vertex_array(&self) -> Result<ObjectId, String> {
        Ok(self.create(Object::VertexArray))
    }

    fn set_vertex_layout(
        &self,
        vertex_array: ObjectId,
        buffer: ObjectId,
        stride: i32,
        attributes: &[VertexAttribute],
    ) {
        self.record(Call::SetVertexLayout {
            vertex_array,
            buffer,
            stride,
            attributes: attributes.to_vec(),
        });
    }

    fn bind_vertex_array(&self, vertex_array: Option<ObjectId>) {
        self.bindings.borrow_mut().vertex_array = vertex_array;
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: ObjectId) {
        self.delete(vertex_array);
    }

    fn viewport(&self) -> [i32; 4] {
        self.viewport.get()
    }

    fn set_viewport(&self, viewport: [i32; 4]) {
        self.viewport.set(viewport);
        self.record(Call::SetViewport(viewport));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(Call::Clear(rgba));
    }

    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32) {
        self.record(Call::Draw {
            primitive,
            first,
            count,
        });
    }

    fn take_error(&self) -> Option<u32> {
        self.errors.borrow_mut().pop_front()
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}
