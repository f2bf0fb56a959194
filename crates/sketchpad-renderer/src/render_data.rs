use serde::{Deserialize, Serialize};
use sketchpad_core::geometry::{Point, Rect, Transform};
use sketchpad_core::shape::Selectable;

/// Where the host should draw the selection outline.
///
/// `rect` is the shape's local bounding rect grown by the configured inset;
/// the host positions it with `transform`, exactly as the shape itself is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionIndicator {
    pub rect: Rect,
    pub transform: Transform,
}

impl SelectionIndicator {
    pub fn for_shape(shape: &dyn Selectable, inset: f64) -> Self {
        Self {
            rect: shape.bounding_rect().inset(-inset, -inset),
            transform: shape.transform(),
        }
    }

    /// The outline's corners in canvas space (top-left, top-right,
    /// bottom-right, bottom-left before transformation).
    pub fn canvas_corners(&self) -> [Point; 4] {
        self.rect.corners().map(|c| self.transform.apply(&c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchpad_core::shape::TwoPointShape;

    #[test]
    fn test_indicator_outsets_and_transforms() {
        let mut rect = TwoPointShape::rect();
        rect.b = Point::new(10.0, 6.0);
        rect.stroke_width = 2.0;
        rect.transform = Transform::translate(100.0, 0.0);

        let indicator = SelectionIndicator::for_shape(&rect, 4.0);
        assert_eq!(indicator.rect, Rect::new(-5.0, -5.0, 20.0, 16.0));
        assert_eq!(indicator.canvas_corners()[0], Point::new(95.0, -5.0));
        assert_eq!(indicator.canvas_corners()[2], Point::new(115.0, 11.0));
    }
}
