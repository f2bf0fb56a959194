use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::geometry::{Size, Transform};
use crate::shape::{Shape, ShapeId};

/// Notification sent to the registered observer on each append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingEvent {
    ShapeAdded { id: ShapeId, index: usize },
}

/// The ordered, append-only collection of committed shapes.
///
/// Shapes are never removed or reordered. After commit, only the transform
/// of a selectable shape may change, through [`Drawing::set_transform`].
#[derive(Debug)]
pub struct Drawing {
    size: Size,
    shapes: Vec<Shape>,
    /// Position of each shape in `shapes`.
    index: HashMap<ShapeId, usize>,
    observer: Option<Sender<DrawingEvent>>,
}

impl Drawing {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            shapes: Vec::new(),
            index: HashMap::new(),
            observer: None,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Register the single observer, replacing any previous one.
    pub fn subscribe(&mut self) -> Receiver<DrawingEvent> {
        let (tx, rx) = mpsc::channel();
        self.observer = Some(tx);
        rx
    }

    // ── Shapes ───────────────────────────────────────────────────────

    pub fn add(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        let index = self.shapes.len();
        log::debug!("Committing {} shape {} at index {}", shape.kind_name(), id, index);
        self.shapes.push(shape);
        self.index.insert(id, index);
        self.notify(DrawingEvent::ShapeAdded { id, index });
        id
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.index.get(id).and_then(|&i| self.shapes.get(i))
    }

    pub fn position(&self, id: &ShapeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn last(&self) -> Option<&Shape> {
        self.shapes.last()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Move a committed selectable shape. Returns `false` if `id` is unknown
    /// or the shape carries no transform.
    pub fn set_transform(&mut self, id: &ShapeId, transform: Transform) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let Some(selectable) = self.shapes[i].as_selectable_mut() else {
            return false;
        };
        selectable.set_transform(transform);
        true
    }

    fn notify(&self, event: DrawingEvent) {
        if let Some(observer) = &self.observer {
            // A dropped receiver just means nobody is listening any more.
            let _ = observer.send(event);
        }
    }
}
