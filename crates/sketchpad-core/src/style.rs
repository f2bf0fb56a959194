use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

/// How the open ends of a stroke are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// Alternating on/off lengths along a stroke, starting `phase` units in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dash {
    pub phase: f64,
    pub lengths: Vec<f64>,
}

impl Dash {
    pub fn new(phase: f64, lengths: Vec<f64>) -> Self {
        Self { phase, lengths }
    }

    /// A dash pattern that would never advance is treated as solid.
    pub fn is_solid(&self) -> bool {
        self.lengths.is_empty()
            || self.lengths.iter().any(|l| !l.is_finite() || *l < 0.0)
            || self.lengths.iter().sum::<f64>() <= 0.0
    }
}

/// Everything a render context needs to stroke a path.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    pub cap: LineCap,
    pub dash: Option<Dash>,
}

impl StrokeStyle {
    pub fn new(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            cap: LineCap::Round,
            dash: None,
        }
    }

    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_dash(mut self, dash: Option<Dash>) -> Self {
        self.dash = dash;
        self
    }
}

/// Font attributes for text shapes. Glyph data lives with the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub size: f64,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Helvetica Neue".to_string(),
            size: 24.0,
        }
    }
}

impl Font {
    pub fn new(family: &str, size: f64) -> Self {
        Self {
            family: family.to_string(),
            size,
        }
    }
}

/// The style fields a shape copies from the global tool state when created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleSnapshot {
    pub stroke_color: Option<Color>,
    pub fill_color: Option<Color>,
    pub stroke_width: f64,
}
