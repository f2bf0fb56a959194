//! Gesture-driven tools.
//!
//! A tool is a small state machine (`idle -> dragging -> idle`) that turns
//! pointer events into shapes or shape edits. Exactly one tool is active
//! at a time; it is the only writer of the [`Drawing`] and the
//! [`GlobalToolState`] while it handles an event, and receives both through
//! a [`ToolOperationContext`] that lives for that single call.
//!
//! Drag events that arrive without a matching drag start are ignored.

mod freehand;
mod selection;
mod text;
mod two_point;

pub use freehand::FreehandTool;
pub use selection::SelectionTool;
pub use text::{TextTool, TextToolDelegate};
pub use two_point::TwoPointTool;

use std::any::Any;

use crate::drawing::Drawing;
use crate::geometry::{Point, Vector};
use crate::render::RenderContext;
use crate::shape::{Selectable, Shape};
use crate::tool_state::GlobalToolState;

/// Everything a tool may touch while handling one event.
pub struct ToolOperationContext<'a> {
    pub drawing: &'a mut Drawing,
    pub tool_state: &'a mut GlobalToolState,
    /// Set when an already committed shape changed, so the persistent
    /// raster no longer matches the drawing and must be rebuilt.
    pub is_persistent_buffer_dirty: bool,
}

impl<'a> ToolOperationContext<'a> {
    pub fn new(drawing: &'a mut Drawing, tool_state: &'a mut GlobalToolState) -> Self {
        Self {
            drawing,
            tool_state,
            is_persistent_buffer_dirty: false,
        }
    }

    /// The currently selected shape, if it is still in the drawing.
    pub fn selected(&self) -> Option<&dyn Selectable> {
        let id = self.tool_state.selected_shape()?;
        self.drawing.get(&id).and_then(Shape::as_selectable)
    }
}

pub trait Tool {
    /// Lets a host reach the concrete tool behind a `dyn Tool`, e.g. to feed
    /// typed text into a [`TextTool`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Progressive tools paint cumulatively within a gesture, so the
    /// compositor keeps each frame instead of redrawing from scratch.
    fn is_progressive(&self) -> bool {
        false
    }

    /// Called when the tool becomes active. `handoff` is a shape another
    /// tool passed along, if any.
    fn activate(&mut self, _ctx: &mut ToolOperationContext, _handoff: Option<Shape>) {}

    /// Called before another tool replaces this one.
    fn deactivate(&mut self, _ctx: &mut ToolOperationContext) {}

    /// The global style or selection changed.
    fn apply(&mut self, _state: &GlobalToolState) {}

    fn handle_tap(&mut self, ctx: &mut ToolOperationContext, point: Point);
    fn handle_drag_start(&mut self, ctx: &mut ToolOperationContext, point: Point);
    fn handle_drag_continue(&mut self, ctx: &mut ToolOperationContext, point: Point, velocity: Vector);
    fn handle_drag_end(&mut self, ctx: &mut ToolOperationContext, point: Point);
    /// Abandon the gesture. Nothing from it may reach the drawing.
    fn handle_drag_cancel(&mut self, ctx: &mut ToolOperationContext);

    /// Draw the uncommitted shape onto the transient buffer.
    fn render_shape_in_progress(&self, _ctx: &mut dyn RenderContext) {}

    /// Draw the whole uncommitted shape, for when the buffer underneath was
    /// reset mid-gesture. Differs from `render_shape_in_progress` only for
    /// progressive tools.
    fn render_entire_shape_in_progress(&self, ctx: &mut dyn RenderContext) {
        self.render_shape_in_progress(ctx);
    }

    /// A selectable shape the tool owns but has not committed yet.
    fn selectable_in_progress(&self) -> Option<&dyn Selectable> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, Transform};
    use crate::shape::TwoPointShape;

    #[test]
    fn test_context_resolves_selection() {
        let mut drawing = Drawing::new(Size::new(100.0, 100.0));
        let mut state = GlobalToolState::default();
        let mut rect = TwoPointShape::rect();
        rect.transform = Transform::translate(2.0, 3.0);
        let id = drawing.add(rect.into());

        let ctx = ToolOperationContext::new(&mut drawing, &mut state);
        assert!(ctx.selected().is_none());
        assert!(!ctx.is_persistent_buffer_dirty);

        state.set_selected_shape(Some(id));
        let ctx = ToolOperationContext::new(&mut drawing, &mut state);
        assert_eq!(ctx.selected().map(|s| s.transform()), Some(Transform::translate(2.0, 3.0)));
    }
}
