//! Compiled programs shared by every font.
//!
//! ```text
//! Context
//! ├── generator  vertex + fragment       draws MSDF texels into an atlas
//! └── renderer   vertex + geometry + fragment
//!                                         one point per glyph -> one quad
//! ```
//!
//! Uniforms are resolved by name once, right after linking. A name the driver
//! does not report (absent, or optimized out) is logged and left unbound;
//! setting it afterwards does nothing.

use std::collections::BTreeSet;
use std::rc::Rc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::backend::{Backend, Owned, OwnedProgram, ShaderStage, UniformValue};
use crate::error::{Error, Result};
use crate::shaders;

/// Named uniform slot of a linked program.
pub(crate) struct Uniform<B: Backend> {
    name: &'static str,
    location: Option<B::UniformLocation>,
}

impl<B: Backend> Uniform<B> {
    fn resolve(backend: &B, program: &OwnedProgram<B>, label: &str, name: &'static str) -> Self {
        let location = backend.uniform_location(program.handle(), name);
        if location.is_none() {
            warn!("{} program has no active uniform `{}`", label, name);
        }
        Self { name, location }
    }

    pub(crate) fn set(&self, backend: &B, value: UniformValue) {
        backend.set_uniform(self.location.as_ref(), value);
    }

    fn resolved_name(&self) -> Option<&'static str> {
        self.location.as_ref().map(|_| self.name)
    }
}

fn link<B: Backend>(
    backend: &Rc<B>,
    label: &'static str,
    stages: &[(ShaderStage, &str)],
) -> Result<OwnedProgram<B>> {
    match backend.compile_program(label, stages) {
        Ok(program) => Ok(Owned::adopt(Rc::clone(backend), program)),
        Err((Some(stage), log)) => {
            error!("{} {} shader failed to compile:\n{}", label, stage, log);
            Err(Error::ShaderCompile {
                program: label,
                stage,
                log,
            })
        }
        Err((None, log)) => {
            error!("{} program failed to link:\n{}", label, log);
            Err(Error::ProgramLink {
                program: label,
                log,
            })
        }
    }
}

/// Rasterizes distance fields into a font's atlas.
pub(crate) struct GeneratorProgram<B: Backend> {
    program: OwnedProgram<B>,
    pub projection: Uniform<B>,
    pub offset: Uniform<B>,
    pub translate: Uniform<B>,
    pub scale: Uniform<B>,
    pub range: Uniform<B>,
    pub glyph_height: Uniform<B>,
    pub meta_offset: Uniform<B>,
    pub point_offset: Uniform<B>,
    pub metadata: Uniform<B>,
    pub point_data: Uniform<B>,
}

impl<B: Backend> GeneratorProgram<B> {
    const LABEL: &'static str = "generator";

    fn build(backend: &Rc<B>) -> Result<Self> {
        let program = link(backend, Self::LABEL, &shaders::generator_stages())?;
        let u = |name| Uniform::resolve(&**backend, &program, Self::LABEL, name);
        Ok(Self {
            projection: u("projection"),
            offset: u("offset"),
            translate: u("translate"),
            scale: u("scale"),
            range: u("range"),
            glyph_height: u("glyph_height"),
            meta_offset: u("meta_offset"),
            point_offset: u("point_offset"),
            metadata: u("metadata"),
            point_data: u("point_data"),
            program,
        })
    }

    pub(crate) fn handle(&self) -> B::Program {
        self.program.handle()
    }

    fn uniforms(&self) -> [&Uniform<B>; 10] {
        [
            &self.projection,
            &self.offset,
            &self.translate,
            &self.scale,
            &self.range,
            &self.glyph_height,
            &self.meta_offset,
            &self.point_offset,
            &self.metadata,
            &self.point_data,
        ]
    }
}

/// Expands glyph instances into quads and reconstructs edges.
pub(crate) struct RendererProgram<B: Backend> {
    program: OwnedProgram<B>,
    pub projection: Uniform<B>,
    pub font_projection: Uniform<B>,
    pub font_index: Uniform<B>,
    pub font_atlas: Uniform<B>,
    pub padding: Uniform<B>,
    pub offset: Uniform<B>,
}

impl<B: Backend> RendererProgram<B> {
    const LABEL: &'static str = "renderer";

    fn build(backend: &Rc<B>) -> Result<Self> {
        let program = link(backend, Self::LABEL, &shaders::renderer_stages())?;
        let u = |name| Uniform::resolve(&**backend, &program, Self::LABEL, name);
        Ok(Self {
            projection: u("projection"),
            font_projection: u("font_projection"),
            font_index: u("font_index"),
            font_atlas: u("font_atlas"),
            padding: u("padding"),
            offset: u("offset"),
            program,
        })
    }

    pub(crate) fn handle(&self) -> B::Program {
        self.program.handle()
    }

    fn uniforms(&self) -> [&Uniform<B>; 6] {
        [
            &self.projection,
            &self.font_projection,
            &self.font_index,
            &self.font_atlas,
            &self.padding,
            &self.offset,
        ]
    }
}

/// Resolved uniform names per program.
///
/// Structural: two contexts on the same driver compare equal even though
/// their handles differ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParameterSchema {
    pub generator: BTreeSet<&'static str>,
    pub renderer: BTreeSet<&'static str>,
}

/// The generator and renderer programs, shared read-only by every
/// [`Font`](crate::Font) built from it.
///
/// Fonts borrow the context, so it cannot be dropped while any font is alive.
pub struct Context<B: Backend> {
    backend: Rc<B>,
    generator: GeneratorProgram<B>,
    renderer: RendererProgram<B>,
}

impl<B: Backend> Context<B> {
    /// Compile and link both programs. Nothing is kept if either fails.
    pub fn create(backend: Rc<B>) -> Result<Self> {
        let generator = GeneratorProgram::build(&backend)?;
        let renderer = RendererProgram::build(&backend)?;
        let context = Self {
            backend,
            generator,
            renderer,
        };
        let schema = context.parameter_schema();
        info!(
            "MSDF context ready: generator {}/10 uniforms, renderer {}/6 uniforms",
            schema.generator.len(),
            schema.renderer.len()
        );
        Ok(context)
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema {
            generator: self
                .generator
                .uniforms()
                .iter()
                .filter_map(|u| u.resolved_name())
                .collect(),
            renderer: self
                .renderer
                .uniforms()
                .iter()
                .filter_map(|u| u.resolved_name())
                .collect(),
        }
    }

    /// Release both programs. Equivalent to dropping the context.
    pub fn destroy(self) {
        info!("MSDF context destroyed");
    }

    pub(crate) fn generator(&self) -> &GeneratorProgram<B> {
        &self.generator
    }

    pub(crate) fn renderer(&self) -> &RendererProgram<B> {
        &self.renderer
    }
}
