//! Embedded GLSL sources.

use crate::backend::ShaderStage;

pub const GENERATE_VERT: &str = include_str!("../shaders/generate.vert");
pub const GENERATE_FRAG: &str = include_str!("../shaders/generate.frag");
pub const RENDER_VERT: &str = include_str!("../shaders/render.vert");
pub const RENDER_GEOM: &str = include_str!("../shaders/render.geom");
pub const RENDER_FRAG: &str = include_str!("../shaders/render.frag");

/// Texels per row of every data texture. Shaders hard-code the same value as
/// `DATA_ROW`.
pub const DATA_ROW: usize = 1024;

pub(crate) fn generator_stages() -> [(ShaderStage, &'static str); 2] {
    [
        (ShaderStage::Vertex, GENERATE_VERT),
        (ShaderStage::Fragment, GENERATE_FRAG),
    ]
}

pub(crate) fn renderer_stages() -> [(ShaderStage, &'static str); 3] {
    [
        (ShaderStage::Vertex, RENDER_VERT),
        (ShaderStage::Geometry, RENDER_GEOM),
        (ShaderStage::Fragment, RENDER_FRAG),
    ]
}
