//! Font creation parameters.
//!
//! A font needs four things and none of them have defaults: where the outlines
//! come from, the distance-field range, the atlas scale, and the atlas size.
//! Callers that want defaults keep them in their own config files:
//!
//! ```ron
//! (
//!     font_source: "assets/fonts/NotoSans-Regular.ttf",
//!     range: 4.0,
//!     scale: 2.0,
//!     texture_size: 1024,
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

/// Errors raised while reading a [`FontConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("font source not found: {0}")]
    MissingFont(PathBuf),
}

/// Full font description, as loaded from RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    /// Path to a TrueType/OpenType file or collection.
    pub font_source: PathBuf,
    /// Width of the distance falloff band, in outline units.
    pub range: f32,
    /// Atlas texels per outline unit.
    pub scale: f32,
    /// Side length of the square atlas, in texels.
    pub texture_size: u32,
    /// Face within a collection.
    #[serde(default)]
    pub face_index: u32,
    /// Outline units per em.
    #[serde(default = "default_em_size")]
    pub em_size: f32,
}

fn default_em_size() -> f32 {
    16.0
}

impl FontConfig {
    pub fn new(font_source: impl Into<PathBuf>, range: f32, scale: f32, texture_size: u32) -> Self {
        Self {
            font_source: font_source.into(),
            range,
            scale,
            texture_size,
            face_index: 0,
            em_size: default_em_size(),
        }
    }

    /// Parse a config from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON config file.
    ///
    /// A relative `font_source` is resolved against the config file's
    /// directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_ron_str(&text)?;
        if config.font_source.is_relative() {
            if let Some(dir) = path.parent() {
                config.font_source = dir.join(&config.font_source);
            }
        }
        Ok(config)
    }

    /// Backend-facing subset.
    pub fn params(&self) -> FontParams {
        FontParams {
            range: self.range,
            scale: self.scale,
            texture_size: self.texture_size,
        }
    }

    /// Check numeric constraints and that the font file exists.
    pub fn validate(&self, max_texture_size: u32) -> Result<()> {
        self.params().validate(max_texture_size)?;
        if !(self.em_size.is_finite() && self.em_size > 0.0) {
            return Err(Error::invalid_config(format!(
                "em_size must be > 0, got {}",
                self.em_size
            )));
        }
        if !self.font_source.exists() {
            return Err(ConfigError::MissingFont(self.font_source.clone()).into());
        }
        Ok(())
    }
}

/// Distance-field parameters for a font with a caller-supplied outline source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontParams {
    pub range: f32,
    pub scale: f32,
    pub texture_size: u32,
}

impl FontParams {
    pub fn validate(&self, max_texture_size: u32) -> Result<()> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(Error::invalid_config(format!(
                "range must be > 0, got {}",
                self.range
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::invalid_config(format!(
                "scale must be > 0, got {}",
                self.scale
            )));
        }
        if self.texture_size == 0 {
            return Err(Error::invalid_config("texture_size must be > 0"));
        }
        if self.texture_size > max_texture_size {
            return Err(Error::invalid_config(format!(
                "texture_size {} exceeds backend maximum {}",
                self.texture_size, max_texture_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_required_fields_with_optional_defaults() {
        let config = FontConfig::from_ron_str(
            r#"(font_source: "mono.ttf", range: 2.0, scale: 2.0, texture_size: 512)"#,
        )
        .unwrap();
        assert_eq!(config.font_source, PathBuf::from("mono.ttf"));
        assert_eq!(config.texture_size, 512);
        assert_eq!(config.face_index, 0);
        assert!((config.em_size - 16.0).abs() < 0.001);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let err = FontConfig::from_ron_str(r#"(font_source: "mono.ttf", range: 2.0, scale: 2.0)"#);
        assert!(matches!(err, Err(ConfigError::Ron(_))));
    }

    #[test]
    fn rejects_non_positive_parameters() {
        let ok = FontParams {
            range: 2.0,
            scale: 2.0,
            texture_size: 512,
        };
        assert!(ok.validate(4096).is_ok());

        for bad in [
            FontParams { range: 0.0, ..ok },
            FontParams { range: -1.0, ..ok },
            FontParams { range: f32::NAN, ..ok },
            FontParams { scale: 0.0, ..ok },
            FontParams {
                texture_size: 0,
                ..ok
            },
            FontParams {
                texture_size: 8192,
                ..ok
            },
        ] {
            assert!(
                matches!(bad.validate(4096), Err(Error::InvalidConfig(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn load_resolves_font_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let font_path = dir.path().join("face.ttf");
        std::fs::write(&font_path, b"not really a font").unwrap();

        let config_path = dir.path().join("font.ron");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"(font_source: "face.ttf", range: 4.0, scale: 1.5, texture_size: 1024, em_size: 32.0)"#
        )
        .unwrap();

        let config = FontConfig::load(&config_path).unwrap();
        assert_eq!(config.font_source, font_path);
        assert!((config.em_size - 32.0).abs() < 0.001);
        assert!(config.validate(4096).is_ok());
    }

    #[test]
    fn validate_reports_missing_font() {
        let config = FontConfig::new("/nonexistent/glyphfield/face.ttf", 2.0, 2.0, 256);
        assert!(matches!(
            config.validate(4096),
            Err(Error::Config(ConfigError::MissingFont(_)))
        ));
    }
}
