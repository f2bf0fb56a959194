//! Fallibly allocated RGBA pixel buffers.

use image::{Rgba, RgbaImage};
use sketchpad_core::geometry::Size;

use crate::error::RenderError;

/// A straight-alpha RGBA8 raster, transparent when created.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    image: RgbaImage,
}

impl Raster {
    /// Allocate a transparent `width` x `height` raster, refusing sizes with
    /// more than `max_pixels` pixels.
    pub fn new(width: u32, height: u32, max_pixels: u64) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize {
                width: width as f64,
                height: height as f64,
            });
        }
        let bytes = checked_len(width, height, max_pixels)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| RenderError::Allocation { bytes })?;
        data.resize(bytes, 0);
        let image = RgbaImage::from_raw(width, height, data).ok_or(RenderError::Allocation { bytes })?;
        Ok(Self { image })
    }

    /// A raster covering a canvas of `size` points (rounded up).
    pub fn for_canvas(size: Size, max_pixels: u64) -> Result<Self, RenderError> {
        let valid = |v: f64| v.is_finite() && v >= 1.0 && v <= u32::MAX as f64;
        if !valid(size.width) || !valid(size.height) {
            return Err(RenderError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        Self::new(size.width.ceil() as u32, size.height.ceil() as u32, max_pixels)
    }

    /// Copy this raster into a new allocation without aborting on failure.
    pub fn try_clone(&self, max_pixels: u64) -> Result<Self, RenderError> {
        let bytes = checked_len(self.width(), self.height(), max_pixels)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| RenderError::Allocation { bytes })?;
        data.extend_from_slice(self.image.as_raw());
        let image = RgbaImage::from_raw(self.width(), self.height(), data)
            .ok_or(RenderError::Allocation { bytes })?;
        Ok(Self { image })
    }

    /// Overwrite this raster with `other`'s pixels, reusing the allocation.
    /// Returns `false` if the sizes differ.
    pub fn copy_from(&mut self, other: &Raster) -> bool {
        if self.image.dimensions() != other.image.dimensions() {
            return false;
        }
        self.image.copy_from_slice(other.image.as_raw());
        true
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.image.fill(0);
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, Rgba(rgba));
        }
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn is_blank(&self) -> bool {
        self.image.as_raw().iter().all(|&b| b == 0)
    }
}

fn checked_len(width: u32, height: u32, max_pixels: u64) -> Result<usize, RenderError> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(RenderError::TooLarge {
            width,
            height,
            limit: max_pixels,
        });
    }
    pixels
        .checked_mul(4)
        .and_then(|b| usize::try_from(b).ok())
        .ok_or(RenderError::Allocation { bytes: usize::MAX })
}
