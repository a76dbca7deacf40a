//! Multi-channel signed distance field text for OpenGL.
//!
//! Glyph outlines are serialized on the CPU, packed into a square atlas, and
//! rasterized into MSDF texels by a fragment shader. Text is then drawn with
//! one point per glyph: a geometry stage expands each point into a quad and
//! the fragment stage reconstructs sharp edges from the channel median.
//!
//! # Pipeline
//!
//! ```text
//! OutlineSource ──buffer_sizes/serialize──► meta + point streams
//!       │                                          │
//!       └── GlyphMetrics ──► ShelfPacker           │ data textures
//!                               │                  ▼
//!                               └──► GlyphIndexEntry ──► generator program ──► atlas (RGBA32F)
//!                                         │                                       │
//!                                         ▼ index texture                         ▼
//! GlyphInstance[] ──► one point each ──► renderer program (vert → geom → frag) ──► screen
//! ```
//!
//! # Key Types
//!
//! |----------------------|--------------------------------------------------|
//! | Type                 | Purpose                                          |
//! |----------------------|--------------------------------------------------|
//! | [`Context`]          | Generator + renderer programs, shared by fonts   |
//! | [`Font`]             | One atlas, its index, and generated advances     |
//! | [`FontConfig`]       | RON-loadable font description                    |
//! | [`OutlineSource`]    | Glyph outline provider (e.g. [`TtfOutlines`])    |
//! | [`GlyphIndexEntry`]  | Atlas placement + metrics, 8 floats per glyph    |
//! | [`GlyphInstance`]    | One glyph to draw (pen, color, size, skew)       |
//! | [`Backend`]          | GL-shaped graphics backend                       |
//! |----------------------|--------------------------------------------------|

pub mod atlas;
pub mod backend;
pub mod config;
pub mod error;
pub mod outline;
pub mod projection;
pub mod shaders;

mod context;
mod font;
mod generate;
mod render;
mod state;

pub use atlas::{AtlasStats, Footprint, GlyphIndexEntry, ShelfPacker};
#[cfg(feature = "glow")]
pub use backend::GlowBackend;
pub use backend::{Backend, RecordingBackend};
pub use config::{ConfigError, FontConfig, FontParams};
pub use context::{Context, ParameterSchema};
pub use error::{Error, Result};
pub use font::Font;
pub use outline::{BufferSizes, GlyphMetrics, OutlineError, OutlineSource, Shape, TtfOutlines};
pub use render::{GlyphInstance, GlyphQuad, TextStyle};
