use std::sync::mpsc::{self, Receiver, Sender};

use crate::shape::ShapeId;
use crate::style::{Color, StyleSnapshot};

/// Notification sent to the registered observer when the state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStateEvent {
    StyleChanged,
    SelectionChanged(Option<ShapeId>),
}

/// Session-wide style settings and the current selection.
///
/// `selected_shape` is a handle to a shape in the drawing (or to the text
/// box a tool is editing), never an owner of the shape it names.
#[derive(Debug)]
pub struct GlobalToolState {
    stroke_color: Option<Color>,
    fill_color: Option<Color>,
    stroke_width: f64,
    selected_shape: Option<ShapeId>,
    observer: Option<Sender<ToolStateEvent>>,
}

impl Default for GlobalToolState {
    fn default() -> Self {
        Self::new(Some(Color::BLUE), None, 20.0)
    }
}

impl GlobalToolState {
    pub fn new(stroke_color: Option<Color>, fill_color: Option<Color>, stroke_width: f64) -> Self {
        Self {
            stroke_color,
            fill_color,
            stroke_width,
            selected_shape: None,
            observer: None,
        }
    }

    /// Register the single observer, replacing any previous one.
    pub fn subscribe(&mut self) -> Receiver<ToolStateEvent> {
        let (tx, rx) = mpsc::channel();
        self.observer = Some(tx);
        rx
    }

    // ── Style ────────────────────────────────────────────────────────

    pub fn stroke_color(&self) -> Option<Color> {
        self.stroke_color
    }

    pub fn fill_color(&self) -> Option<Color> {
        self.fill_color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_stroke_color(&mut self, color: Option<Color>) {
        self.stroke_color = color;
        self.notify(ToolStateEvent::StyleChanged);
    }

    pub fn set_fill_color(&mut self, color: Option<Color>) {
        self.fill_color = color;
        self.notify(ToolStateEvent::StyleChanged);
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.stroke_width = width;
        self.notify(ToolStateEvent::StyleChanged);
    }

    /// The values a new shape copies at creation time.
    pub fn style(&self) -> StyleSnapshot {
        StyleSnapshot {
            stroke_color: self.stroke_color,
            fill_color: self.fill_color,
            stroke_width: self.stroke_width,
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    pub fn selected_shape(&self) -> Option<ShapeId> {
        self.selected_shape
    }

    /// Every assignment notifies, even when the value is unchanged.
    pub fn set_selected_shape(&mut self, shape: Option<ShapeId>) {
        if self.selected_shape != shape {
            log::debug!("Selection changed: {:?} -> {:?}", self.selected_shape, shape);
        }
        self.selected_shape = shape;
        self.notify(ToolStateEvent::SelectionChanged(shape));
    }

    fn notify(&self, event: ToolStateEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}
