use crate::geometry::Size;
use crate::style::Font;

/// Measures a single line of text in unscaled local units.
pub trait TextMetrics {
    fn measure(&self, text: &str, font: &Font) -> Size;
}

/// Fixed-ratio metrics for hosts without font data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl TextMetrics for ApproximateMetrics {
    fn measure(&self, text: &str, font: &Font) -> Size {
        let chars = text.chars().count() as f64;
        Size::new(chars * font.size * 0.6, font.size * 1.2)
    }
}
