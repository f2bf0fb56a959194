use std::any::Any;

use crate::geometry::{Point, Vector};
use crate::render::RenderContext;
use crate::shape::{FreehandSegment, FreehandShape, Renderable, StyleApplicable};
use crate::tool_state::GlobalToolState;
use crate::velocity::modulated_width;

use super::{Tool, ToolOperationContext};

/// Pen and eraser. The eraser is the same tool with `is_eraser` set on
/// every shape it creates.
#[derive(Debug)]
pub struct FreehandTool {
    is_eraser: bool,
    /// Thin the stroke as the pointer speeds up.
    pub velocity_based_width: bool,
    shape_in_progress: Option<FreehandShape>,
    last_velocity: Vector,
}

impl FreehandTool {
    pub fn pen() -> Self {
        Self {
            is_eraser: false,
            velocity_based_width: true,
            shape_in_progress: None,
            last_velocity: Vector::ZERO,
        }
    }

    pub fn eraser() -> Self {
        Self {
            is_eraser: true,
            velocity_based_width: false,
            ..Self::pen()
        }
    }

    pub fn is_eraser(&self) -> bool {
        self.is_eraser
    }

    pub fn shape_in_progress(&self) -> Option<&FreehandShape> {
        self.shape_in_progress.as_ref()
    }

    fn make_shape(&self, ctx: &ToolOperationContext, point: Point) -> FreehandShape {
        let mut shape = FreehandShape::new(point, self.is_eraser);
        shape.apply_style(&ctx.tool_state.style());
        shape
    }
}

impl Tool for FreehandTool {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn name(&self) -> &'static str {
        if self.is_eraser {
            "Eraser"
        } else {
            "Pen"
        }
    }

    fn is_progressive(&self) -> bool {
        true
    }

    /// Restyle a stroke that has not moved yet, so its dot previews the new
    /// settings. Drawn segments keep the width they were drawn with.
    fn apply(&mut self, state: &GlobalToolState) {
        if let Some(shape) = &mut self.shape_in_progress {
            if shape.segments().is_empty() {
                shape.apply_style(&state.style());
            }
        }
    }

    /// A tap commits a single unfinished dot.
    fn handle_tap(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        let shape = self.make_shape(ctx, point);
        ctx.drawing.add(shape.into());
    }

    fn handle_drag_start(&mut self, ctx: &mut ToolOperationContext, point: Point) {
        self.last_velocity = Vector::ZERO;
        self.shape_in_progress = Some(self.make_shape(ctx, point));
    }

    fn handle_drag_continue(&mut self, _ctx: &mut ToolOperationContext, point: Point, velocity: Vector) {
        let Some(shape) = &mut self.shape_in_progress else {
            return;
        };
        let width = if self.velocity_based_width {
            modulated_width(shape.stroke_width, velocity, self.last_velocity, shape.last_width())
        } else {
            shape.stroke_width
        };
        shape.add_segment(FreehandSegment::new(shape.last_point(), point, width));
        self.last_velocity = velocity;
    }

    fn handle_drag_end(&mut self, ctx: &mut ToolOperationContext, _point: Point) {
        if let Some(mut shape) = self.shape_in_progress.take() {
            shape.is_finished = true;
            ctx.drawing.add(shape.into());
        }
    }

    fn handle_drag_cancel(&mut self, _ctx: &mut ToolOperationContext) {
        self.shape_in_progress = None;
    }

    /// Only the newest increment: earlier ones are already on the buffer.
    fn render_shape_in_progress(&self, ctx: &mut dyn RenderContext) {
        if let Some(shape) = &self.shape_in_progress {
            shape.render_latest_segment(ctx);
        }
    }

    fn render_entire_shape_in_progress(&self, ctx: &mut dyn RenderContext) {
        if let Some(shape) = &self.shape_in_progress {
            shape.render(ctx);
        }
    }
}
