use std::any::Any;

use crate::geometry::{Point, Vector};
use crate::render::RenderContext;
use crate::shape::{Renderable, Shape, StyleApplicable, TwoPointKind, TwoPointShape};

use super::{Tool, ToolOperationContext};

/// Drag from A to B to create a line, rectangle or ellipse.
#[derive(Debug)]
pub struct TwoPointTool {
    kind: TwoPointKind,
    shape_in_progress: Option<TwoPointShape>,
}

impl TwoPointTool {
    pub fn new(kind: TwoPointKind) -> Self {
        Self {
            kind,
            shape_in_progress: None,
        }
    }

    pub fn line() -> Self {
        Self::new(TwoPointKind::Line)
    }

    pub fn rect() -> Self {
        Self::new(TwoPointKind::Rect)
    }

    pub fn ellipse() -> Self {
        Self::new(TwoPointKind::Ellipse)
    }

    pub fn kind(&self) -> TwoPointKind {
        self.kind
    }

    pub fn shape_in_progress(&self) -> Option<&TwoPointShape> {
        self.shape_in_progress.as_ref()
    }

    fn make_shape(&self, ctx: &ToolOperationContext, point: Point) -> TwoPointShape {
        let mut shape = TwoPointShape::new(self.kind).anchored_at(point);
        shape.apply_style(&ctx.tool_state.style());
        shape
    }
}

impl Tool for TwoPointTool {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn name(&self) -> &'static str {
        match self.kind {
            TwoPointKind::Line => "Line",
            TwoPointKind::Rect => "Rectangle",
            TwoPointKind::Ellipse => "Ellipse",
        }
    }

    fn activate(&mut self, ctx: &mut ToolOperationContext, _handoff: Option<Shape>) {
        ctx.tool_state.set_selected_shape(None);
    }

    /// A tap commits a zero-size shape at the tap point.
    fn handle_tap(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        let shape = self.make_shape(ctx, point);
        ctx.drawing.add(shape.into());
    }

    fn handle_drag_start(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        self.shape_in_progress = Some(self.make_shape(ctx, point));
    }

    fn handle_drag_continue(&mut self, _ctx: &mut ToolOperationContext, point: Point, _velocity: Vector) {
        if let Some(shape) = &mut self.shape_in_progress {
            shape.b = point;
        }
    }

    fn handle_drag_end(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        if let Some(mut shape) = self.shape_in_progress.take() {
            shape.b = point;
            ctx.drawing.add(shape.into());
        }
    }

    fn handle_drag_cancel(&mut self, _ctx: &mut ToolOperationContext) {
        self.shape_in_progress = None;
    }

    fn render_shape_in_progress(&self, ctx: &mut dyn RenderContext) {
        if let Some(shape) = &self.shape_in_progress {
            shape.render(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::Drawing;
    use crate::geometry::{Rect, Size};
    use crate::render::testing::RecordingContext;
    use crate::style::Color;
    use crate::tool_state::GlobalToolState;

    fn setup() -> (Drawing, GlobalToolState) {
        (Drawing::new(Size::new(200.0, 200.0)), GlobalToolState::default())
    }

    fn only_two_point(drawing: &Drawing) -> &TwoPointShape {
        match drawing.last() {
            Some(Shape::TwoPoint(shape)) => shape,
            other => panic!("expected a two-point shape, got {other:?}"),
        }
    }

    #[test]
    fn test_tap_commits_degenerate_shape() {
        let (mut drawing, mut state) = setup();
        let mut tool = TwoPointTool::rect();
        tool.handle_tap(&mut ToolOperationContext::new(&mut drawing, &mut state), Point::new(20.0, 20.0));

        assert_eq!(drawing.len(), 1);
        let rect = only_two_point(&drawing);
        assert_eq!(rect.normalized_rect(), Rect::new(20.0, 20.0, 0.0, 0.0));
        assert_eq!(rect.stroke_width, 20.0);
        assert_eq!(rect.stroke_color, Some(Color::BLUE));
    }

    #[test]
    fn test_drag_updates_b_and_commits_on_end() {
        let (mut drawing, mut state) = setup();
        let mut tool = TwoPointTool::ellipse();
        let mut ctx = ToolOperationContext::new(&mut drawing, &mut state);

        tool.handle_drag_start(&mut ctx, Point::new(10.0, 10.0));
        let id = tool.shape_in_progress().map(|s| s.id);
        tool.handle_drag_continue(&mut ctx, Point::new(40.0, 30.0), Vector::ZERO);
        assert_eq!(tool.shape_in_progress().map(|s| s.b), Some(Point::new(40.0, 30.0)));
        assert!(ctx.drawing.is_empty());

        tool.handle_drag_end(&mut ctx, Point::new(50.0, 60.0));
        assert!(tool.shape_in_progress().is_none());
        let ellipse = only_two_point(&drawing);
        assert_eq!(Some(ellipse.id), id);
        assert_eq!(ellipse.a, Point::new(10.0, 10.0));
        assert_eq!(ellipse.b, Point::new(50.0, 60.0));
    }

    #[test]
    fn test_cancel_discards() {
        let (mut drawing, mut state) = setup();
        let mut tool = TwoPointTool::line();
        let mut ctx = ToolOperationContext::new(&mut drawing, &mut state);
        tool.handle_drag_start(&mut ctx, Point::new(0.0, 0.0));
        tool.handle_drag_continue(&mut ctx, Point::new(5.0, 5.0), Vector::ZERO);
        tool.handle_drag_cancel(&mut ctx);
        tool.handle_drag_end(&mut ctx, Point::new(9.0, 9.0));
        assert!(drawing.is_empty());
    }

    #[test]
    fn test_events_without_drag_start_are_ignored() {
        let (mut drawing, mut state) = setup();
        let mut tool = TwoPointTool::rect();
        let mut ctx = ToolOperationContext::new(&mut drawing, &mut state);
        tool.handle_drag_continue(&mut ctx, Point::new(5.0, 5.0), Vector::ZERO);
        tool.handle_drag_end(&mut ctx, Point::new(5.0, 5.0));
        tool.handle_drag_cancel(&mut ctx);
        assert!(drawing.is_empty());
    }

    #[test]
    fn test_activate_clears_selection() {
        let (mut drawing, mut state) = setup();
        let id = drawing.add(TwoPointShape::rect().into());
        state.set_selected_shape(Some(id));
        let mut tool = TwoPointTool::rect();
        tool.activate(&mut ToolOperationContext::new(&mut drawing, &mut state), None);
        assert!(state.selected_shape().is_none());
    }

    #[test]
    fn test_renders_only_while_dragging() {
        let (mut drawing, mut state) = setup();
        let mut tool = TwoPointTool::rect();
        let mut rec = RecordingContext::default();
        tool.render_shape_in_progress(&mut rec);
        assert!(rec.ops.is_empty());

        tool.handle_drag_start(&mut ToolOperationContext::new(&mut drawing, &mut state), Point::new(1.0, 1.0));
        tool.render_shape_in_progress(&mut rec);
        assert_eq!(rec.strokes().len(), 1);
        assert!(!tool.is_progressive());
    }
}
