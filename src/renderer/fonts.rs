use log::warn;
use rusttype::{Font, Scale};
use std::fs;

use crate::renderer::RenderError;

pub struct FontConfig {
    pub font: Font<'static>,
    pub scale: Scale,
}

/// The dashboard font at its three sizes. Empty when no font could be loaded,
/// in which case text is skipped.
#[derive(Default)]
pub struct Fonts {
    font: Option<Font<'static>>,
}

impl Fonts {
    pub fn load(path: &str) -> Result<Self, RenderError> {
        let data = fs::read(path).map_err(|source| RenderError::FontRead {
            path: path.to_string(),
            source,
        })?;
        let font = Font::try_from_vec(data).ok_or_else(|| RenderError::InvalidFont(path.to_string()))?;
        Ok(Self { font: Some(font) })
    }

    /// Like `load`, but falls back to no text.
    pub fn load_or_empty(path: &str) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Dashboard text disabled: {}", e);
            Self::default()
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.font.is_some()
    }

    pub fn title(&self) -> Option<FontConfig> {
        self.sized(20.0)
    }

    pub fn regular(&self) -> Option<FontConfig> {
        self.sized(16.0)
    }

    pub fn small(&self) -> Option<FontConfig> {
        self.sized(13.0)
    }

    fn sized(&self, scale: f32) -> Option<FontConfig> {
        self.font.as_ref().map(|font| FontConfig {
            font: font.clone(),
            scale: Scale::uniform(scale),
        })
    }
}
