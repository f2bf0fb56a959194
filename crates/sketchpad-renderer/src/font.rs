//! TrueType/OpenType glyph rendering for text shapes.

use std::path::Path;

use ab_glyph::{point, Font as _, FontArc, GlyphId, PxScale, ScaleFont};
use sketchpad_core::geometry::Size;
use sketchpad_core::style::Font;
use sketchpad_core::text::TextMetrics;

use crate::error::RenderError;

/// A loaded font face. Family names on shapes are informational; every
/// text shape is drawn with this face at the shape's size.
#[derive(Clone)]
pub struct GlyphFont {
    font: FontArc,
}

impl std::fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphFont")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

/// Coverage of one rendered line of text, in pixels of the requested scale.
/// `left`/`top` locate the mask relative to the line's top-left corner.
#[derive(Debug, Clone)]
pub struct GlyphMask {
    pub left: f32,
    pub top: f32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl GlyphMask {
    /// Bilinear sample at mask coordinates (pixel centres at `i + 0.5`).
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let at = |xi: f32, yi: f32| -> f32 {
            if xi < 0.0 || yi < 0.0 || xi >= self.width as f32 || yi >= self.height as f32 {
                return 0.0;
            }
            self.data[yi as usize * self.width as usize + xi as usize]
        };
        let top = at(x0, y0) * (1.0 - tx) + at(x0 + 1.0, y0) * tx;
        let bottom = at(x0, y0 + 1.0) * (1.0 - tx) + at(x0 + 1.0, y0 + 1.0) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

impl GlyphFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontArc::try_from_vec(bytes).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)?;
        let font = Self::from_bytes(bytes)?;
        log::info!("Loaded font {} ({} glyphs)", path.display(), font.font.glyph_count());
        Ok(font)
    }

    /// Glyph ids and pen positions for `text` on a baseline at `ascent`.
    fn layout(&self, text: &str, px: f32) -> Vec<(GlyphId, f32)> {
        let scaled = self.font.as_scaled(PxScale::from(px));
        let mut caret = 0.0;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push((id, caret));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        glyphs
    }

    /// Rasterize one line of text at `px` pixels per em.
    pub fn render_line(&self, text: &str, px: f32) -> Option<GlyphMask> {
        if text.is_empty() || !(px.is_finite() && px > 0.0) {
            return None;
        }
        let scaled = self.font.as_scaled(PxScale::from(px));
        let ascent = scaled.ascent();
        let outlined: Vec<_> = self
            .layout(text, px)
            .into_iter()
            .filter_map(|(id, x)| {
                let glyph = id.with_scale_and_position(PxScale::from(px), point(x, ascent));
                self.font.outline_glyph(glyph)
            })
            .collect();

        let mut bounds: Option<ab_glyph::Rect> = None;
        for glyph in &outlined {
            let b = glyph.px_bounds();
            bounds = Some(match bounds {
                None => b,
                Some(acc) => ab_glyph::Rect {
                    min: point(acc.min.x.min(b.min.x), acc.min.y.min(b.min.y)),
                    max: point(acc.max.x.max(b.max.x), acc.max.y.max(b.max.y)),
                },
            });
        }
        let bounds = bounds?;
        let width = (bounds.max.x - bounds.min.x).ceil().max(0.0) as u32;
        let height = (bounds.max.y - bounds.min.y).ceil().max(0.0) as u32;
        if width == 0 || height == 0 {
            return None;
        }

        let mut data = vec![0.0f32; width as usize * height as usize];
        for glyph in &outlined {
            let b = glyph.px_bounds();
            let dx = (b.min.x - bounds.min.x) as u32;
            let dy = (b.min.y - bounds.min.y) as u32;
            glyph.draw(|x, y, coverage| {
                let (px, py) = (x + dx, y + dy);
                if px < width && py < height {
                    let cell = &mut data[py as usize * width as usize + px as usize];
                    *cell = (*cell + coverage).min(1.0);
                }
            });
        }
        Some(GlyphMask {
            left: bounds.min.x,
            top: bounds.min.y,
            width,
            height,
            data,
        })
    }
}

impl TextMetrics for GlyphFont {
    fn measure(&self, text: &str, font: &Font) -> Size {
        let px = font.size as f32;
        let scaled = self.font.as_scaled(PxScale::from(px));
        let width = self
            .layout(text, px)
            .last()
            .map_or(0.0, |&(id, x)| x + scaled.h_advance(id));
        Size::new(width as f64, scaled.height() as f64)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::GlyphFont;

    /// DejaVu Sans Mono, bundled so glyph tests never depend on system fonts.
    const FIXTURE: &[u8] = include_bytes!("testdata/DejaVuSansMono.ttf");

    pub fn fixture_font() -> GlyphFont {
        GlyphFont::from_bytes(FIXTURE.to_vec()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::fixture_font;
    use super::*;

    #[test]
    fn test_invalid_font_bytes() {
        assert!(matches!(
            GlyphFont::from_bytes(vec![1, 2, 3]),
            Err(RenderError::Font(_))
        ));
    }

    #[test]
    fn test_missing_font_file() {
        assert!(matches!(
            GlyphFont::load(Path::new("/nonexistent/font.ttf")),
            Err(RenderError::Io(_))
        ));
    }

    #[test]
    fn test_mask_sampling() {
        let mask = GlyphMask {
            left: 0.0,
            top: 0.0,
            width: 2,
            height: 1,
            data: vec![1.0, 0.0],
        };
        assert!((mask.sample(0.5, 0.5) - 1.0).abs() < 1e-6);
        assert!((mask.sample(1.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(mask.sample(10.0, 10.0), 0.0);
    }

    #[test]
    fn test_measure_grows_with_text() {
        let font = fixture_font();
        let style = Font::new("DejaVu Sans Mono", 20.0);
        let short = font.measure("ab", &style);
        let long = font.measure("abcd", &style);
        // Monospaced: every glyph advances the same distance.
        assert!((long.width - 2.0 * short.width).abs() < 1e-3);
        assert!(short.width > 10.0 && short.width < 40.0);
        assert!((short.height - long.height).abs() < 1e-9);
        assert!((short.height - 20.0).abs() < 0.01);
        assert_eq!(font.measure("", &style).width, 0.0);
    }

    #[test]
    fn test_render_line_has_ink() {
        let font = fixture_font();
        let mask = font.render_line("Hi", 24.0).unwrap();
        assert!(mask.width > 0 && mask.height > 0);
        assert!(mask.width <= 2 * 24);
        assert!(mask.data.iter().any(|&c| c > 0.9));
        assert!(font.render_line("", 24.0).is_none());
        assert!(font.render_line(" ", 24.0).is_none());
        assert!(font.render_line("Hi", 0.0).is_none());
    }

    #[test]
    fn test_load_reads_font_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/testdata/DejaVuSansMono.ttf");
        let font = GlyphFont::load(&path).unwrap();
        assert!(font.render_line("A", 12.0).is_some());
    }
}
