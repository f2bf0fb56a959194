use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid raster size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },

    #[error("Raster of {width}x{height} exceeds the {limit} pixel limit")]
    TooLarge { width: u32, height: u32, limit: u64 },

    #[error("Could not allocate {bytes} bytes for a raster buffer")]
    Allocation { bytes: usize },

    #[error("Font error: {0}")]
    Font(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
