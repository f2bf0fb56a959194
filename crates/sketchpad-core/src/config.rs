use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Size;
use crate::shape::DEFAULT_TEXT_PADDING;
use crate::style::{Color, Font};
use crate::text::TextMetrics;
use crate::tool_state::GlobalToolState;
use crate::tools::{FreehandTool, TextTool};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings for a drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub canvas_size: Size,
    pub style: StyleDefaults,
    /// Outset between a selected shape's bounds and its indicator.
    pub selection_inset: f64,
    pub text: TextDefaults,
    pub freehand: FreehandDefaults,
    /// Largest raster buffer (in pixels) the renderer will allocate.
    pub max_raster_pixels: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub stroke_color: Option<Color>,
    pub fill_color: Option<Color>,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub font_family: String,
    pub font_size: f64,
    pub padding: Size,
    /// TrueType/OpenType file used to rasterize text.
    pub font_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreehandDefaults {
    pub pen_velocity_width: bool,
    pub eraser_velocity_width: bool,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            canvas_size: Size::new(800.0, 600.0),
            style: StyleDefaults::default(),
            selection_inset: 4.0,
            text: TextDefaults::default(),
            freehand: FreehandDefaults::default(),
            max_raster_pixels: 4096 * 4096,
        }
    }
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            stroke_color: Some(Color::BLUE),
            fill_color: None,
            stroke_width: 20.0,
        }
    }
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font_family: "Helvetica Neue".to_string(),
            font_size: 24.0,
            padding: DEFAULT_TEXT_PADDING,
            font_path: None,
        }
    }
}

impl Default for FreehandDefaults {
    fn default() -> Self {
        Self {
            pen_velocity_width: true,
            eraser_velocity_width: false,
        }
    }
}

impl SketchConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded sketch config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Size { width, height } = self.canvas_size;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(invalid("canvas_size", format!("{width}x{height} is not a positive size")));
        }
        let stroke = self.style.stroke_width;
        if !(stroke > 0.0 && stroke.is_finite()) {
            return Err(invalid("style.stroke_width", format!("{stroke} must be positive")));
        }
        if self.selection_inset.is_nan() || self.selection_inset < 0.0 {
            return Err(invalid(
                "selection_inset",
                format!("{} must not be negative", self.selection_inset),
            ));
        }
        if !(self.text.font_size > 0.0 && self.text.font_size.is_finite()) {
            return Err(invalid(
                "text.font_size",
                format!("{} must be positive", self.text.font_size),
            ));
        }
        if self.max_raster_pixels == 0 {
            return Err(invalid("max_raster_pixels", "must be non-zero".to_string()));
        }
        Ok(())
    }

    /// A fresh tool state seeded from the style defaults.
    pub fn tool_state(&self) -> GlobalToolState {
        GlobalToolState::new(
            self.style.stroke_color,
            self.style.fill_color,
            self.style.stroke_width,
        )
    }

    pub fn pen_tool(&self) -> FreehandTool {
        let mut tool = FreehandTool::pen();
        tool.velocity_based_width = self.freehand.pen_velocity_width;
        tool
    }

    pub fn eraser_tool(&self) -> FreehandTool {
        let mut tool = FreehandTool::eraser();
        tool.velocity_based_width = self.freehand.eraser_velocity_width;
        tool
    }

    pub fn text_tool(&self, metrics: Box<dyn TextMetrics>) -> TextTool {
        let mut tool = TextTool::new(metrics)
            .with_font(Font::new(&self.text.font_family, self.text.font_size));
        tool.padding = self.text.padding;
        tool
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
