//! # Sketchpad Renderer
//!
//! CPU rasterizer and incremental compositor for Sketchpad drawings.
//! Shapes are painted through [`canvas::Canvas`], an implementation of
//! `sketchpad_core::render::RenderContext` over RGBA rasters, and the
//! [`compositor::Compositor`] keeps the persistent and transient buffers
//! in step with the active tool's gestures.

pub mod error;
pub mod raster;
mod rasterize;
pub mod canvas;
pub mod font;
pub mod render_data;
pub mod compositor;

pub use canvas::Canvas;
pub use compositor::{Compositor, DisplayedBuffer, PointerEvent};
pub use error::RenderError;
pub use font::GlyphFont;
pub use raster::Raster;
pub use render_data::SelectionIndicator;
