//! Incremental three-buffer raster pipeline.
//!
//! - **persistent**: every committed shape. Each append draws only the new
//!   shape on top; the whole drawing is replayed only when a tool reports
//!   that an already committed shape moved.
//! - **transient**: a copy of the persistent buffer taken at drag start.
//! - **transient with shape in progress**: the transient buffer plus the
//!   active tool's uncommitted shape, rebuilt on every drag sample and
//!   displayed while dragging.
//!
//! Progressive tools (freehand) advance the transient buffer to the last
//! displayed frame after each sample, so only the newest increment is drawn
//! next time. Other tools redraw their whole shape onto an untouched
//! transient buffer every frame so that shrinking or moving shapes leave no
//! trail.

use std::sync::mpsc::Receiver;

use sketchpad_core::config::SketchConfig;
use sketchpad_core::drawing::{Drawing, DrawingEvent};
use sketchpad_core::geometry::{Point, Size, Vector};
use sketchpad_core::render::RenderContext;
use sketchpad_core::shape::{Renderable, Shape};
use sketchpad_core::text::{ApproximateMetrics, TextMetrics};
use sketchpad_core::tool_state::{GlobalToolState, ToolStateEvent};
use sketchpad_core::tools::{Tool, ToolOperationContext};

use crate::canvas::Canvas;
use crate::error::RenderError;
use crate::font::GlyphFont;
use crate::raster::Raster;
use crate::render_data::SelectionIndicator;

/// One pointer event from the host, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Tap(Point),
    DragBegin(Point),
    DragMove { point: Point, velocity: Vector },
    DragEnd(Point),
    DragCancel,
}

/// Which buffer the host should currently show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayedBuffer {
    Persistent,
    TransientWithShapeInProgress,
}

pub struct Compositor {
    drawing: Drawing,
    tool_state: GlobalToolState,
    tool: Option<Box<dyn Tool>>,
    drawing_events: Receiver<DrawingEvent>,
    state_events: Receiver<ToolStateEvent>,
    font: Option<GlyphFont>,
    selection_inset: f64,
    max_raster_pixels: u64,

    persistent: Raster,
    transient: Option<Raster>,
    transient_with_shape_in_progress: Option<Raster>,
    displayed: DisplayedBuffer,
    dragging: bool,
    selection_indicator: Option<SelectionIndicator>,
}

impl Compositor {
    /// A compositor with default settings for a canvas of `size`.
    pub fn new(size: Size) -> Result<Self, RenderError> {
        Self::from_config(&SketchConfig {
            canvas_size: size,
            ..SketchConfig::default()
        })
    }

    /// Allocates the persistent buffer up front. A configured font that
    /// fails to load is reported and text is then skipped.
    pub fn from_config(config: &SketchConfig) -> Result<Self, RenderError> {
        let persistent = Raster::for_canvas(config.canvas_size, config.max_raster_pixels)?;
        let mut drawing = Drawing::new(config.canvas_size);
        let mut tool_state = config.tool_state();
        let drawing_events = drawing.subscribe();
        let state_events = tool_state.subscribe();

        let font = config.text.font_path.as_ref().and_then(|path| {
            GlyphFont::load(path)
                .map_err(|err| log::warn!("Could not load font {}: {err}", path.display()))
                .ok()
        });

        log::info!(
            "Compositor ready: {}x{} canvas",
            persistent.width(),
            persistent.height()
        );
        Ok(Self {
            drawing,
            tool_state,
            tool: None,
            drawing_events,
            state_events,
            font,
            selection_inset: config.selection_inset,
            max_raster_pixels: config.max_raster_pixels,
            persistent,
            transient: None,
            transient_with_shape_in_progress: None,
            displayed: DisplayedBuffer::Persistent,
            dragging: false,
            selection_indicator: None,
        })
    }

    pub fn with_font(mut self, font: GlyphFont) -> Self {
        self.font = Some(font);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    pub fn tool_state(&self) -> &GlobalToolState {
        &self.tool_state
    }

    pub fn tool(&self) -> Option<&dyn Tool> {
        self.tool.as_deref()
    }

    pub fn font(&self) -> Option<&GlyphFont> {
        self.font.as_ref()
    }

    /// Metrics for text tools: the loaded font if any, else an estimate.
    pub fn text_metrics(&self) -> Box<dyn TextMetrics> {
        match &self.font {
            Some(font) => Box::new(font.clone()),
            None => Box::new(ApproximateMetrics),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn displayed_buffer(&self) -> DisplayedBuffer {
        self.displayed
    }

    /// The raster the host should show right now.
    pub fn displayed(&self) -> &Raster {
        match (self.displayed, &self.transient_with_shape_in_progress) {
            (DisplayedBuffer::TransientWithShapeInProgress, Some(frame)) => frame,
            _ => &self.persistent,
        }
    }

    pub fn persistent(&self) -> &Raster {
        &self.persistent
    }

    pub fn transient(&self) -> Option<&Raster> {
        self.transient.as_ref()
    }

    pub fn transient_with_shape_in_progress(&self) -> Option<&Raster> {
        self.transient_with_shape_in_progress.as_ref()
    }

    pub fn selection_indicator(&self) -> Option<SelectionIndicator> {
        self.selection_indicator
    }

    // ── Tools and state ──────────────────────────────────────────────

    /// Make `tool` the active tool. A drag in progress is cancelled first,
    /// then the outgoing tool is deactivated before the new one activates.
    pub fn set_tool(&mut self, tool: Box<dyn Tool>, handoff: Option<Shape>) {
        if self.dragging {
            log::debug!("Cancelling active drag before switching tools");
            self.handle(PointerEvent::DragCancel);
        }

        let mut dirty = false;
        if let Some(mut old) = self.tool.take() {
            let mut ctx = ToolOperationContext::new(&mut self.drawing, &mut self.tool_state);
            old.deactivate(&mut ctx);
            dirty |= ctx.is_persistent_buffer_dirty;
            log::debug!("Switching tool: {} -> {}", old.name(), tool.name());
        } else {
            log::debug!("Activating tool {}", tool.name());
        }

        self.tool = Some(tool);
        dirty |= self.dispatch(|tool, ctx| tool.activate(ctx, handoff));
        if let Some(tool) = &mut self.tool {
            tool.apply(&self.tool_state);
        }
        self.after_event(dirty);
    }

    /// Edit the global style or selection. The active tool is notified
    /// before this returns.
    ///
    /// During a drag the shape in progress may have been restyled, so the
    /// transient buffer is reset from the persistent one and the whole shape
    /// redrawn; a progressive tool's earlier frames would otherwise keep the
    /// old style on screen.
    pub fn edit_tool_state(&mut self, edit: impl FnOnce(&mut GlobalToolState)) {
        edit(&mut self.tool_state);
        self.after_event(false);
        if self.dragging {
            self.snapshot_transient();
            self.update_uncommitted_shape_buffers(true);
        }
    }

    /// Run `f` on the active tool if it is a `T`, e.g. to set the text of
    /// the box a [`TextTool`](sketchpad_core::tools::TextTool) is editing.
    /// Returns `None` when another kind of tool is active.
    pub fn with_tool<T: Tool + 'static, R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let tool = self.tool.as_deref_mut()?.as_any_mut().downcast_mut::<T>()?;
        let result = f(tool);
        self.after_event(false);
        Some(result)
    }

    // ── Pointer events ───────────────────────────────────────────────

    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Tap(point) => {
                if self.dragging {
                    log::warn!("Ignoring tap at {point:?} during an active drag");
                    return;
                }
                let dirty = self.dispatch(|tool, ctx| tool.handle_tap(ctx, point));
                self.after_event(dirty);
            }
            PointerEvent::DragBegin(point) => {
                if self.dragging {
                    log::warn!("Drag began while another was active; cancelling the first");
                    self.handle(PointerEvent::DragCancel);
                }
                self.dragging = true;
                self.snapshot_transient();
                let dirty = self.dispatch(|tool, ctx| tool.handle_drag_start(ctx, point));
                self.update_uncommitted_shape_buffers(false);
                self.after_event(dirty);
            }
            PointerEvent::DragMove { point, velocity } => {
                if !self.dragging {
                    return;
                }
                let dirty = self.dispatch(|tool, ctx| tool.handle_drag_continue(ctx, point, velocity));
                self.update_uncommitted_shape_buffers(false);
                self.after_event(dirty);
            }
            PointerEvent::DragEnd(point) => {
                if !self.dragging {
                    return;
                }
                self.dragging = false;
                let dirty = self.dispatch(|tool, ctx| tool.handle_drag_end(ctx, point));
                self.displayed = DisplayedBuffer::Persistent;
                self.after_event(dirty);
            }
            PointerEvent::DragCancel => {
                if !self.dragging {
                    return;
                }
                self.dragging = false;
                let dirty = self.dispatch(|tool, ctx| tool.handle_drag_cancel(ctx));
                self.displayed = DisplayedBuffer::Persistent;
                self.after_event(dirty);
            }
        }
    }

    fn dispatch(&mut self, f: impl FnOnce(&mut dyn Tool, &mut ToolOperationContext)) -> bool {
        let Some(tool) = self.tool.as_deref_mut() else {
            return false;
        };
        let mut ctx = ToolOperationContext::new(&mut self.drawing, &mut self.tool_state);
        f(tool, &mut ctx);
        ctx.is_persistent_buffer_dirty
    }

    // ── Buffers ──────────────────────────────────────────────────────

    /// Copy the persistent buffer into the transient one, reusing its
    /// allocation when there is one.
    fn snapshot_transient(&mut self) {
        if let Some(transient) = &mut self.transient {
            if transient.copy_from(&self.persistent) {
                return;
            }
        }
        match self.persistent.try_clone(self.max_raster_pixels) {
            Ok(copy) => self.transient = Some(copy),
            Err(err) => {
                log::warn!("Could not allocate transient buffer: {err}");
                self.transient = None;
            }
        }
    }

    /// Rebuild the displayed frame from the transient buffer. `entire`
    /// draws the whole shape in progress instead of its newest increment.
    fn update_uncommitted_shape_buffers(&mut self, entire: bool) {
        let Some(transient) = &mut self.transient else {
            log::warn!("No transient buffer; skipping frame");
            return;
        };

        let reused = match &mut self.transient_with_shape_in_progress {
            Some(frame) => frame.copy_from(transient),
            None => false,
        };
        if !reused {
            match transient.try_clone(self.max_raster_pixels) {
                Ok(copy) => self.transient_with_shape_in_progress = Some(copy),
                Err(err) => {
                    log::warn!("Skipping frame: {err}");
                    return;
                }
            }
        }
        let Some(frame) = &mut self.transient_with_shape_in_progress else {
            return;
        };

        let progressive = match &self.tool {
            Some(tool) => {
                let mut canvas = Canvas::new(frame, self.font.as_ref());
                if entire {
                    tool.render_entire_shape_in_progress(&mut canvas);
                } else {
                    tool.render_shape_in_progress(&mut canvas);
                }
                tool.is_progressive()
            }
            None => false,
        };
        if progressive {
            transient.copy_from(frame);
        }
        self.displayed = DisplayedBuffer::TransientWithShapeInProgress;
        log::trace!("Composited frame (progressive: {progressive})");
    }

    /// React to everything the last tool call changed.
    fn after_event(&mut self, dirty: bool) {
        if dirty {
            // The replay below covers any shapes added in the meantime.
            self.drawing_events.try_iter().for_each(drop);
            self.redraw_absolutely_everything();
        } else {
            for event in self.drawing_events.try_iter() {
                let DrawingEvent::ShapeAdded { index, .. } = event;
                if let Some(shape) = self.drawing.shapes().get(index) {
                    render_shapes(&mut self.persistent, self.font.as_ref(), std::iter::once(shape));
                }
            }
        }

        for event in self.state_events.try_iter() {
            log::trace!("Tool state event: {event:?}");
            if let Some(tool) = &mut self.tool {
                tool.apply(&self.tool_state);
            }
        }
        self.refresh_selection_indicator();
    }

    fn redraw_absolutely_everything(&mut self) {
        log::debug!("Replaying {} shapes onto the persistent buffer", self.drawing.len());
        self.persistent.clear();
        render_shapes(&mut self.persistent, self.font.as_ref(), self.drawing.shapes().iter());
        self.displayed = DisplayedBuffer::Persistent;
    }

    fn refresh_selection_indicator(&mut self) {
        let inset = self.selection_inset;
        self.selection_indicator = self.tool_state.selected_shape().and_then(|id| {
            self.drawing
                .get(&id)
                .and_then(Shape::as_selectable)
                .or_else(|| self.tool.as_deref().and_then(|tool| tool.selectable_in_progress()))
                .map(|shape| SelectionIndicator::for_shape(shape, inset))
        });
    }
}

fn render_shapes<'a>(
    raster: &mut Raster,
    font: Option<&GlyphFont>,
    shapes: impl Iterator<Item = &'a Shape>,
) {
    let mut canvas = Canvas::new(raster, font);
    for shape in shapes {
        shape.render(&mut canvas as &mut dyn RenderContext);
    }
}
