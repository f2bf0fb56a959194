//! # Sketchpad Core
//!
//! Vector drawing model: geometry and affine transforms, the closed shape
//! set (line, rectangle, ellipse, freehand pen/eraser, text), the
//! append-only drawing, global tool state with selection, and the
//! gesture-driven tools that create and move shapes.
//!
//! Rendering goes through the [`render::RenderContext`] trait; the raster
//! implementation and compositor live in `sketchpad-renderer`.

pub mod geometry;
pub mod style;
pub mod path;
pub mod render;
pub mod text;
pub mod velocity;
pub mod shape;
pub mod drawing;
pub mod tool_state;
pub mod tools;
pub mod config;

pub use config::{ConfigError, SketchConfig};
pub use drawing::{Drawing, DrawingEvent};
pub use geometry::{Matrix, Point, Rect, Size, Transform, Vector};
pub use shape::{Shape, ShapeId};
pub use style::{Color, Font};
pub use tool_state::{GlobalToolState, ToolStateEvent};
pub use tools::{Tool, ToolOperationContext};
