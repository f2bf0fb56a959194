//! The immediate-mode drawing surface shapes render into.
//!
//! Shapes only ever talk to this trait; the raster implementation lives in
//! `sketchpad-renderer`. Graphics state (current matrix, blend mode) is
//! saved and restored as a stack, so a shape can push its own transform
//! without leaking it to the next shape.

use crate::geometry::{Matrix, Point};
use crate::path::Path;
use crate::style::{Color, Font, StrokeStyle};

/// How painted coverage combines with the pixels already in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Normal painting on top of existing content.
    #[default]
    SourceOver,
    /// Painted coverage clears the destination to transparent.
    Clear,
}

pub trait RenderContext {
    /// Push the current graphics state.
    fn save(&mut self);
    /// Pop back to the most recently saved graphics state.
    fn restore(&mut self);
    /// Prepend `matrix` to the current transform (local -> current space).
    fn concat(&mut self, matrix: &Matrix);
    fn set_blend_mode(&mut self, mode: BlendMode);

    fn stroke_path(&mut self, path: &Path, style: &StrokeStyle);
    fn fill_path(&mut self, path: &Path, color: Color);
    /// Draw a single line of text with its top-left corner at `origin`.
    fn fill_text(&mut self, text: &str, font: &Font, origin: Point, color: Color);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// One recorded call on a [`RecordingContext`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Save,
        Restore,
        Concat(Matrix),
        Blend(BlendMode),
        Stroke(Path, StrokeStyle),
        Fill(Path, Color),
        Text(String, Point, Color),
    }

    /// A render context that records calls instead of rasterizing.
    #[derive(Debug, Default)]
    pub struct RecordingContext {
        pub ops: Vec<Op>,
    }

    impl RecordingContext {
        pub fn strokes(&self) -> Vec<&StrokeStyle> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Stroke(_, style) => Some(style),
                    _ => None,
                })
                .collect()
        }

        pub fn is_balanced(&self) -> bool {
            let mut depth = 0i32;
            for op in &self.ops {
                match op {
                    Op::Save => depth += 1,
                    Op::Restore => depth -= 1,
                    _ => {}
                }
                if depth < 0 {
                    return false;
                }
            }
            depth == 0
        }
    }

    impl RenderContext for RecordingContext {
        fn save(&mut self) {
            self.ops.push(Op::Save);
        }

        fn restore(&mut self) {
            self.ops.push(Op::Restore);
        }

        fn concat(&mut self, matrix: &Matrix) {
            self.ops.push(Op::Concat(*matrix));
        }

        fn set_blend_mode(&mut self, mode: BlendMode) {
            self.ops.push(Op::Blend(mode));
        }

        fn stroke_path(&mut self, path: &Path, style: &StrokeStyle) {
            self.ops.push(Op::Stroke(path.clone(), style.clone()));
        }

        fn fill_path(&mut self, path: &Path, color: Color) {
            self.ops.push(Op::Fill(path.clone(), color));
        }

        fn fill_text(&mut self, text: &str, _font: &Font, origin: Point, color: Color) {
            self.ops.push(Op::Text(text.to_string(), origin, color));
        }
    }
}
