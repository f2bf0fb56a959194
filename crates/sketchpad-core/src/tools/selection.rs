use std::any::Any;

use crate::geometry::{Point, Transform, Vector};
use crate::shape::{HitTestable, Shape, ShapeId};

use super::{Tool, ToolOperationContext};

/// State captured when a drag of the selected shape begins.
#[derive(Debug, Clone, Copy)]
struct MoveGesture {
    shape: ShapeId,
    original_transform: Transform,
    start_point: Point,
}

/// Tap to select a committed shape, drag to move it.
#[derive(Debug, Default)]
pub struct SelectionTool {
    gesture: Option<MoveGesture>,
}

impl SelectionTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the gesture's shape to its original position plus the drag delta.
    fn move_to(&self, ctx: &mut ToolOperationContext, point: Point) {
        let Some(gesture) = self.gesture else {
            return;
        };
        let delta = point - gesture.start_point;
        if ctx
            .drawing
            .set_transform(&gesture.shape, gesture.original_transform.translated(delta))
        {
            ctx.is_persistent_buffer_dirty = true;
        }
    }
}

impl Tool for SelectionTool {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn name(&self) -> &'static str {
        "Selection"
    }

    /// A handed-off shape is committed, then selected if it can be.
    fn activate(&mut self, ctx: &mut ToolOperationContext, handoff: Option<Shape>) {
        let Some(shape) = handoff else {
            return;
        };
        let selectable = shape.is_selectable();
        let id = ctx.drawing.add(shape);
        if selectable {
            ctx.tool_state.set_selected_shape(Some(id));
        }
    }

    /// Select the first selectable shape under `point`, in drawing order.
    /// Tapping the current selection or empty canvas clears the selection.
    fn handle_tap(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        let current = ctx.tool_state.selected_shape();
        let mut new_selection = None;
        if let Some(hit) = ctx.drawing.shapes().iter().find(|s| s.hit_test(&point)) {
            if hit.is_selectable() {
                if Some(hit.id()) == current {
                    // Placeholder: re-tapping the selection has no action of
                    // its own yet, so it falls through to deselecting.
                } else {
                    new_selection = Some(hit.id());
                }
            }
        }
        ctx.tool_state.set_selected_shape(new_selection);
    }

    fn handle_drag_start(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        let Some(id) = ctx.tool_state.selected_shape() else {
            return;
        };
        let Some(selected) = ctx.selected() else {
            return;
        };
        self.gesture = Some(MoveGesture {
            shape: id,
            original_transform: selected.transform(),
            start_point: point,
        });
    }

    fn handle_drag_continue(&mut self, ctx: &mut ToolOperationContext, point: Point, _velocity: Vector) {
        self.move_to(ctx, point);
    }

    fn handle_drag_end(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        self.move_to(ctx, point);
        self.gesture = None;
    }

    fn handle_drag_cancel(&mut self, ctx: &mut ToolOperationContext) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if ctx.drawing.set_transform(&gesture.shape, gesture.original_transform) {
            ctx.is_persistent_buffer_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::Drawing;
    use crate::geometry::Size;
    use crate::shape::{FreehandShape, TwoPointShape};
    use crate::tool_state::GlobalToolState;

    fn setup() -> (Drawing, GlobalToolState) {
        (Drawing::new(Size::new(200.0, 200.0)), GlobalToolState::default())
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
        let mut shape = TwoPointShape::rect();
        shape.a = Point::new(x, y);
        shape.b = Point::new(x + w, y + h);
        shape.stroke_width = 2.0;
        shape.into()
    }

    fn transform_of(drawing: &Drawing, id: &ShapeId) -> Transform {
        drawing
            .get(id)
            .and_then(Shape::as_selectable)
            .map(|s| s.transform())
            .unwrap()
    }

    #[test]
    fn test_tap_selects_first_hit_in_order() {
        let (mut drawing, mut state) = setup();
        let bottom = drawing.add(rect(0.0, 0.0, 50.0, 50.0));
        let _top = drawing.add(rect(10.0, 10.0, 50.0, 50.0));
        let mut tool = SelectionTool::new();
        tool.handle_tap(&mut ToolOperationContext::new(&mut drawing, &mut state), Point::new(20.0, 20.0));
        assert_eq!(state.selected_shape(), Some(bottom));
    }

    #[test]
    fn test_tap_empty_space_clears_selection() {
        let (mut drawing, mut state) = setup();
        let id = drawing.add(rect(0.0, 0.0, 10.0, 10.0));
        state.set_selected_shape(Some(id));
        let mut tool = SelectionTool::new();
        tool.handle_tap(&mut ToolOperationContext::new(&mut drawing, &mut state), Point::new(150.0, 150.0));
        assert!(state.selected_shape().is_none());
    }

    #[test]
    fn test_retap_of_selection_deselects() {
        let (mut drawing, mut state) = setup();
        let id = drawing.add(rect(0.0, 0.0, 10.0, 10.0));
        let mut tool = SelectionTool::new();
        let p = Point::new(5.0, 5.0);
        tool.handle_tap(&mut ToolOperationContext::new(&mut drawing, &mut state), p);
        assert_eq!(state.selected_shape(), Some(id));
        tool.handle_tap(&mut ToolOperationContext::new(&mut drawing, &mut state), p);
        assert!(state.selected_shape().is_none());
    }

    #[test]
    fn test_freehand_is_never_selected() {
        let (mut drawing, mut state) = setup();
        drawing.add(FreehandShape::new(Point::new(5.0, 5.0), false).into());
        let mut tool = SelectionTool::new();
        tool.handle_tap(&mut ToolOperationContext::new(&mut drawing, &mut state), Point::new(5.0, 5.0));
        assert!(state.selected_shape().is_none());
    }

    #[test]
    fn test_drag_translates_selected_shape() {
        let (mut drawing, mut state) = setup();
        let id = drawing.add(rect(0.0, 0.0, 10.0, 10.0));
        state.set_selected_shape(Some(id));
        let mut tool = SelectionTool::new();

        let mut ctx = ToolOperationContext::new(&mut drawing, &mut state);
        tool.handle_drag_start(&mut ctx, Point::new(5.0, 5.0));
        assert!(!ctx.is_persistent_buffer_dirty);
        tool.handle_drag_continue(&mut ctx, Point::new(8.0, 9.0), Vector::ZERO);
        assert!(ctx.is_persistent_buffer_dirty);
        tool.handle_drag_end(&mut ctx, Point::new(15.0, 5.0));

        assert_eq!(transform_of(&drawing, &id), Transform::translate(10.0, 0.0));
    }

    #[test]
    fn test_cancel_restores_original_transform() {
        let (mut drawing, mut state) = setup();
        let mut shape = TwoPointShape::rect();
        shape.b = Point::new(10.0, 10.0);
        shape.transform = Transform {
            translation: Point::new(3.0, 4.0),
            rotation: 0.25,
            scale: 2.0,
        };
        let before = shape.transform;
        let id = drawing.add(shape.into());
        state.set_selected_shape(Some(id));
        let mut tool = SelectionTool::new();

        let mut ctx = ToolOperationContext::new(&mut drawing, &mut state);
        tool.handle_drag_start(&mut ctx, Point::new(0.0, 0.0));
        tool.handle_drag_continue(&mut ctx, Point::new(30.0, -10.0), Vector::ZERO);
        tool.handle_drag_cancel(&mut ctx);
        assert!(ctx.is_persistent_buffer_dirty);

        assert_eq!(transform_of(&drawing, &id), before);
    }

    #[test]
    fn test_drag_without_selection_is_ignored() {
        let (mut drawing, mut state) = setup();
        let id = drawing.add(rect(0.0, 0.0, 10.0, 10.0));
        let mut tool = SelectionTool::new();
        let mut ctx = ToolOperationContext::new(&mut drawing, &mut state);
        tool.handle_drag_start(&mut ctx, Point::new(5.0, 5.0));
        tool.handle_drag_continue(&mut ctx, Point::new(50.0, 5.0), Vector::ZERO);
        tool.handle_drag_cancel(&mut ctx);
        assert!(!ctx.is_persistent_buffer_dirty);
        assert_eq!(transform_of(&drawing, &id), Transform::IDENTITY);
    }

    #[test]
    fn test_activate_with_handoff_commits_and_selects() {
        let (mut drawing, mut state) = setup();
        let mut tool = SelectionTool::new();
        let shape = rect(0.0, 0.0, 10.0, 10.0);
        let id = shape.id();
        tool.activate(&mut ToolOperationContext::new(&mut drawing, &mut state), Some(shape));
        assert_eq!(drawing.len(), 1);
        assert_eq!(state.selected_shape(), Some(id));
    }
}
