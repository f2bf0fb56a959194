use std::any::Any;

use crate::geometry::{Point, Rect, Size, Transform, Vector};
use crate::render::RenderContext;
use crate::shape::{
    HitTestable, Renderable, Selectable, Shape, StyleApplicable, TextShape, DEFAULT_TEXT_PADDING,
};
use crate::style::Font;
use crate::text::TextMetrics;
use crate::tool_state::GlobalToolState;

use super::{Tool, ToolOperationContext};

/// Host hooks for placing new text and reacting when editing ends.
pub trait TextToolDelegate {
    /// Where a text box created by a tap at `tapped` should be centred.
    fn point_for_new_text(&mut self, tapped: Point) -> Point {
        tapped
    }

    /// The user tapped outside the text being edited.
    fn did_tap_away(&mut self, _tapped: Point) {}
}

/// Tap to place a text box, then feed it text with [`TextTool::set_text`].
///
/// The box being edited stays owned by the tool until editing ends, at
/// which point non-empty text is committed to the drawing.
pub struct TextTool {
    metrics: Box<dyn TextMetrics>,
    delegate: Option<Box<dyn TextToolDelegate>>,
    pub font: Font,
    pub padding: Size,
    shape_in_progress: Option<TextShape>,
    drag: Option<(Transform, Point)>,
}

impl TextTool {
    pub fn new(metrics: Box<dyn TextMetrics>) -> Self {
        Self {
            metrics,
            delegate: None,
            font: Font::default(),
            padding: DEFAULT_TEXT_PADDING,
            shape_in_progress: None,
            drag: None,
        }
    }

    pub fn with_delegate(mut self, delegate: Box<dyn TextToolDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    pub fn is_editing(&self) -> bool {
        self.shape_in_progress.is_some()
    }

    pub fn text_in_progress(&self) -> Option<&TextShape> {
        self.shape_in_progress.as_ref()
    }

    /// Replace the content of the box being edited.
    pub fn set_text(&mut self, text: &str) {
        if let Some(shape) = &mut self.shape_in_progress {
            shape.set_text(text, self.metrics.as_ref());
        }
    }

    /// Canvas rect a host text widget should cover while editing.
    pub fn editing_frame(&self) -> Option<Rect> {
        self.shape_in_progress.as_ref().map(TextShape::frame)
    }

    fn begin_editing(&mut self, ctx: &mut ToolOperationContext, shape: TextShape) {
        log::debug!("Editing text {}", shape.id);
        ctx.tool_state.set_selected_shape(Some(shape.id));
        self.shape_in_progress = Some(shape);
    }

    /// Stop editing, committing the box unless it is empty.
    fn end_editing(&mut self, ctx: &mut ToolOperationContext) {
        self.drag = None;
        let Some(shape) = self.shape_in_progress.take() else {
            return;
        };
        if ctx.tool_state.selected_shape() == Some(shape.id) {
            ctx.tool_state.set_selected_shape(None);
        }
        if shape.text().is_empty() {
            log::debug!("Discarding empty text {}", shape.id);
        } else {
            ctx.drawing.add(shape.into());
        }
    }

    fn move_to(&mut self, point: Point) {
        if let (Some((original, start)), Some(shape)) = (self.drag, &mut self.shape_in_progress) {
            shape.set_transform(original.translated(point - start));
        }
    }
}

impl Tool for TextTool {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn name(&self) -> &'static str {
        "Text"
    }

    /// A handed-off text shape is opened for editing right away.
    fn activate(&mut self, ctx: &mut ToolOperationContext, handoff: Option<Shape>) {
        match handoff {
            Some(Shape::Text(mut shape)) => {
                shape.remeasure(self.metrics.as_ref());
                self.begin_editing(ctx, shape);
            }
            Some(other) => {
                log::warn!("Text tool cannot edit a {} shape; ignoring handoff", other.kind_name());
            }
            None => {}
        }
    }

    fn deactivate(&mut self, ctx: &mut ToolOperationContext) {
        self.end_editing(ctx);
    }

    fn apply(&mut self, state: &GlobalToolState) {
        if let Some(shape) = &mut self.shape_in_progress {
            shape.apply_style(&state.style());
        }
    }

    fn handle_tap(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        if let Some(shape) = &self.shape_in_progress {
            if shape.hit_test(&point) {
                // Taps inside the box belong to the host text widget.
                return;
            }
            self.end_editing(ctx);
            if let Some(delegate) = &mut self.delegate {
                delegate.did_tap_away(point);
            }
            return;
        }

        let position = match &mut self.delegate {
            Some(delegate) => delegate.point_for_new_text(point),
            None => point,
        };
        let mut shape = TextShape::new(self.font.clone(), self.metrics.as_ref());
        shape.padding = self.padding;
        shape.apply_style(&ctx.tool_state.style());
        shape.transform.translation = position;
        self.begin_editing(ctx, shape);
    }

    /// Only a drag that starts on the box being edited moves it.
    fn handle_drag_start(&mut self, _ctx: &mut ToolOperationContext, point: Point) {
        if let Some(shape) = &self.shape_in_progress {
            if shape.hit_test(&point) {
                self.drag = Some((shape.transform, point));
            }
        }
    }

    fn handle_drag_continue(&mut self, _ctx: &mut ToolOperationContext, point: Point, _velocity: Vector) {
        self.move_to(point);
    }

    fn handle_drag_end(&mut self, _ctx: &mut ToolOperationContext, point: Point) {
        self.move_to(point);
        self.drag = None;
    }

    fn handle_drag_cancel(&mut self, _ctx: &mut ToolOperationContext) {
        if let (Some((original, _)), Some(shape)) = (self.drag.take(), &mut self.shape_in_progress) {
            shape.set_transform(original);
        }
    }

    fn render_shape_in_progress(&self, ctx: &mut dyn RenderContext) {
        if let Some(shape) = &self.shape_in_progress {
            shape.render(ctx);
        }
    }

    fn selectable_in_progress(&self) -> Option<&dyn Selectable> {
        self.shape_in_progress.as_ref().map(|s| s as &dyn Selectable)
    }
}
