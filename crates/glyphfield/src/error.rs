//! Error types.

use thiserror::Error;

use crate::backend::ShaderStage;
use crate::config::ConfigError;
use crate::outline::OutlineError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by context creation, font creation and glyph generation.
///
/// Render-time GPU errors never show up here; they are logged and rendering
/// continues.
#[derive(Debug, Error)]
pub enum Error {
    /// A shader stage failed to compile.
    #[error("{program} {stage} shader failed to compile: {log}")]
    ShaderCompile {
        program: &'static str,
        stage: ShaderStage,
        log: String,
    },

    /// A program failed to link.
    #[error("{program} program failed to link: {log}")]
    ProgramLink { program: &'static str, log: String },

    /// The backend refused to create a GPU object.
    #[error("failed to allocate {what}: {reason}")]
    Allocation { what: &'static str, reason: String },

    /// The framebuffer wrapping the atlas is not complete.
    #[error("atlas framebuffer incomplete (status 0x{status:04x})")]
    IncompleteFramebuffer { status: u32 },

    /// Font parameters broke a constraint.
    #[error("invalid font configuration: {0}")]
    InvalidConfig(String),

    /// Inverted glyph range.
    #[error("invalid glyph range {first}..={last}")]
    InvalidRange { first: u32, last: u32 },

    /// Generation was asked for no glyphs at all.
    #[error("empty glyph batch")]
    EmptyBatch,

    /// Glyph already present in the atlas, or listed twice in one batch.
    #[error("glyph {glyph_id} is already generated")]
    AlreadyGenerated { glyph_id: u32 },

    /// The font file could not be opened or parsed.
    #[error("failed to load font: {0}")]
    FontLoad(#[source] OutlineError),

    /// The outline source failed; the whole batch was discarded.
    #[error("outline for glyph {glyph_id}: {source}")]
    Outline {
        glyph_id: u32,
        #[source]
        source: OutlineError,
    },

    /// The atlas has no room left for this glyph.
    #[error("atlas full: glyph {glyph_id} ({width}x{height}) does not fit a {texture_size}px atlas")]
    AtlasFull {
        glyph_id: u32,
        width: f32,
        height: f32,
        texture_size: u32,
    },

    /// A batch asks for more glyphs than the atlas could ever still hold.
    #[error("batch of {requested} glyphs exceeds the remaining capacity of {capacity}")]
    BatchTooLarge { requested: u64, capacity: u64 },

    /// A serialized stream is longer than a data texture can address.
    #[error("{what} stream of {texels} texels exceeds the {limit} texel limit")]
    DataTooLarge {
        what: &'static str,
        texels: usize,
        limit: usize,
    },

    /// Loading the font configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an Allocation error.
    pub fn allocation(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Allocation {
            what,
            reason: reason.into(),
        }
    }

    /// True for failures caused by atlas capacity, where a retry with a
    /// larger texture could succeed.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::AtlasFull { .. } | Self::BatchTooLarge { .. } | Self::DataTooLarge { .. }
        )
    }
}
