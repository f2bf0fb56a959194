//! [`RenderContext`] implementation that paints into a [`Raster`].

use sketchpad_core::geometry::{Matrix, Point};
use sketchpad_core::path::Path;
use sketchpad_core::render::{BlendMode, RenderContext};
use sketchpad_core::style::{Color, Font, StrokeStyle};

use crate::font::GlyphFont;
use crate::raster::Raster;
use crate::rasterize::{apply_dash, blend_pixel, composite, fill_coverage, flatten, stroke_coverage};

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    matrix: Matrix,
    blend: BlendMode,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            blend: BlendMode::SourceOver,
        }
    }
}

/// A drawing context over one raster for the duration of a render pass.
pub struct Canvas<'a> {
    raster: &'a mut Raster,
    font: Option<&'a GlyphFont>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    warned_missing_font: bool,
}

impl<'a> Canvas<'a> {
    pub fn new(raster: &'a mut Raster, font: Option<&'a GlyphFont>) -> Self {
        Self {
            raster,
            font,
            state: GraphicsState::default(),
            stack: Vec::new(),
            warned_missing_font: false,
        }
    }

    /// Current local-to-device matrix.
    pub fn matrix(&self) -> Matrix {
        self.state.matrix
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.state.blend
    }

    fn clip(&self) -> (u32, u32) {
        (self.raster.width(), self.raster.height())
    }
}

impl RenderContext for Canvas<'_> {
    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => log::warn!("Canvas restore without a matching save"),
        }
    }

    fn concat(&mut self, matrix: &Matrix) {
        self.state.matrix = matrix.then(&self.state.matrix);
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn stroke_path(&mut self, path: &Path, style: &StrokeStyle) {
        let scale = self.state.matrix.scale_factor();
        let mut polylines = flatten(path, &self.state.matrix);
        if let Some(dash) = &style.dash {
            polylines = apply_dash(polylines, dash, scale);
        }
        let (w, h) = self.clip();
        if let Some(mask) = stroke_coverage(&polylines, style.width * scale, style.cap, w, h) {
            composite(self.raster.image_mut(), &mask, style.color, self.state.blend);
        }
    }

    fn fill_path(&mut self, path: &Path, color: Color) {
        let polylines = flatten(path, &self.state.matrix);
        let (w, h) = self.clip();
        if let Some(mask) = fill_coverage(&polylines, w, h) {
            composite(self.raster.image_mut(), &mask, color, self.state.blend);
        }
    }

    /// Glyphs are rendered at device resolution in the text's local frame,
    /// then every device pixel samples them through the inverse matrix, so
    /// rotated and scaled text keeps its shape.
    fn fill_text(&mut self, text: &str, font: &Font, origin: Point, color: Color) {
        let Some(glyphs) = self.font else {
            if !self.warned_missing_font {
                log::warn!("No font loaded; skipping text rendering");
                self.warned_missing_font = true;
            }
            return;
        };
        let matrix = self.state.matrix;
        let Some(inverse) = matrix.invert() else {
            return;
        };
        let scale = matrix.scale_factor();
        let Some(mask) = glyphs.render_line(text, (font.size * scale) as f32) else {
            return;
        };

        // Mask rect in local space, then its device-space bounding box.
        let left = origin.x + mask.left as f64 / scale;
        let top = origin.y + mask.top as f64 / scale;
        let right = left + mask.width as f64 / scale;
        let bottom = top + mask.height as f64 / scale;
        let corners = [
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ]
        .map(|c| matrix.apply(&c));
        let (w, h) = self.clip();
        let min_x = corners.iter().map(|c| c.x).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let min_y = corners.iter().map(|c| c.y).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let max_x = corners.iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max).ceil().min(w as f64);
        let max_y = corners.iter().map(|c| c.y).fold(f64::NEG_INFINITY, f64::max).ceil().min(h as f64);
        if !(max_x > min_x && max_y > min_y) {
            return;
        }

        let blend = self.state.blend;
        let image = self.raster.image_mut();
        for y in min_y as u32..max_y as u32 {
            for x in min_x as u32..max_x as u32 {
                let local = inverse.apply(&Point::new(x as f64 + 0.5, y as f64 + 0.5));
                let mx = ((local.x - left) * scale) as f32;
                let my = ((local.y - top) * scale) as f32;
                let coverage = mask.sample(mx, my);
                if coverage > 0.0 {
                    blend_pixel(image, x, y, color, coverage, blend);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::testing::fixture_font;
    use sketchpad_core::geometry::Rect;
    use sketchpad_core::style::LineCap;

    fn raster(w: u32, h: u32) -> Raster {
        Raster::new(w, h, 1 << 20).unwrap()
    }

    #[test]
    fn test_fill_rect_pixels() {
        let mut target = raster(8, 8);
        let mut canvas = Canvas::new(&mut target, None);
        canvas.fill_path(&Path::rect(Rect::new(2.0, 2.0, 3.0, 3.0)), Color::RED);
        assert_eq!(target.pixel(3, 3), Some([255, 0, 0, 255]));
        assert_eq!(target.pixel(1, 1), Some([0, 0, 0, 0]));
        assert_eq!(target.pixel(5, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_concat_and_restore() {
        let mut target = raster(20, 20);
        let mut canvas = Canvas::new(&mut target, None);
        canvas.save();
        canvas.concat(&Matrix::translation(10.0, 10.0));
        canvas.fill_path(&Path::rect(Rect::new(0.0, 0.0, 2.0, 2.0)), Color::BLUE);
        canvas.restore();
        assert_eq!(canvas.matrix(), Matrix::IDENTITY);
        canvas.fill_path(&Path::rect(Rect::new(0.0, 0.0, 2.0, 2.0)), Color::RED);

        assert_eq!(target.pixel(11, 11), Some([0, 0, 255, 255]));
        assert_eq!(target.pixel(1, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_concat_prepends() {
        let mut target = raster(4, 4);
        let mut canvas = Canvas::new(&mut target, None);
        canvas.concat(&Matrix::translation(5.0, 0.0));
        canvas.concat(&Matrix::scale(2.0));
        // Scale applies first, then the earlier translation.
        assert_eq!(canvas.matrix().apply(&Point::new(1.0, 1.0)), Point::new(7.0, 2.0));
    }

    #[test]
    fn test_stroke_width_scales_with_matrix() {
        let mut target = raster(40, 40);
        let mut canvas = Canvas::new(&mut target, None);
        canvas.concat(&Matrix::scale(2.0));
        let style = StrokeStyle::new(Color::BLACK, 2.0).with_cap(LineCap::Butt);
        canvas.stroke_path(&Path::line(Point::new(2.0, 10.0), Point::new(18.0, 10.0)), &style);
        // Device line at y=20, 4 px wide: rows 18..22.
        assert_eq!(target.pixel(20, 18).map(|p| p[3]), Some(255));
        assert_eq!(target.pixel(20, 21).map(|p| p[3]), Some(255));
        assert_eq!(target.pixel(20, 23).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_clear_blend_erases() {
        let mut target = raster(10, 10);
        let mut canvas = Canvas::new(&mut target, None);
        canvas.fill_path(&Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0)), Color::RED);
        canvas.save();
        canvas.set_blend_mode(BlendMode::Clear);
        canvas.fill_path(&Path::rect(Rect::new(0.0, 0.0, 5.0, 10.0)), Color::BLACK);
        canvas.restore();
        assert_eq!(canvas.blend_mode(), BlendMode::SourceOver);
        assert_eq!(target.pixel(2, 2), Some([0, 0, 0, 0]));
        assert_eq!(target.pixel(7, 2), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_text_without_font_is_skipped() {
        let mut target = raster(10, 10);
        let mut canvas = Canvas::new(&mut target, None);
        canvas.fill_text("hi", &Font::default(), Point::ZERO, Color::BLACK);
        canvas.fill_text("hi", &Font::default(), Point::ZERO, Color::BLACK);
        assert!(target.is_blank());
    }

    #[test]
    fn test_text_follows_transform() {
        let font = fixture_font();
        let ink = |raster: &Raster, x0: u32, x1: u32| {
            (0..raster.height())
                .flat_map(|y| (x0..x1).map(move |x| (x, y)))
                .filter(|&(x, y)| raster.pixel(x, y).is_some_and(|p| p[3] > 0))
                .count()
        };

        let mut plain = raster(80, 40);
        Canvas::new(&mut plain, Some(&font)).fill_text("H", &Font::new("Any", 20.0), Point::new(4.0, 4.0), Color::BLACK);
        assert!(ink(&plain, 0, 40) > 0);
        assert_eq!(ink(&plain, 40, 80), 0);

        let mut moved = raster(80, 40);
        let mut canvas = Canvas::new(&mut moved, Some(&font));
        canvas.concat(&Matrix::translation(40.0, 0.0));
        canvas.fill_text("H", &Font::new("Any", 20.0), Point::new(4.0, 4.0), Color::BLACK);
        assert_eq!(ink(&moved, 0, 40), 0);
        assert_eq!(ink(&moved, 40, 80), ink(&plain, 0, 40));
    }

    #[test]
    fn test_rotated_text_runs_down_the_canvas() {
        let font = fixture_font();
        let mut target = raster(80, 60);
        let mut canvas = Canvas::new(&mut target, Some(&font));
        canvas.concat(&Matrix::translation(40.0, 0.0));
        canvas.concat(&Matrix::rotation(std::f64::consts::FRAC_PI_2));
        canvas.fill_text("HHHH", &Font::new("Any", 20.0), Point::new(4.0, 4.0), Color::BLACK);

        let inked: Vec<(u32, u32)> = (0..60)
            .flat_map(|y| (0..80).map(move |x| (x, y)))
            .filter(|&(x, y)| target.pixel(x, y).is_some_and(|p| p[3] > 0))
            .collect();
        assert!(!inked.is_empty());
        let span = |coord: fn(&(u32, u32)) -> u32| {
            let min = inked.iter().map(coord).min().unwrap_or(0);
            let max = inked.iter().map(coord).max().unwrap_or(0);
            max - min
        };
        let (width, height) = (span(|p| p.0), span(|p| p.1));
        assert!(height > 2 * width, "ink spans {width}x{height}");
        // Rotated about the canvas origin, then shifted right: nothing past x=40.
        assert!(inked.iter().all(|&(x, _)| x < 40));
    }
}
