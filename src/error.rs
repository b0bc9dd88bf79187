//! Error types for layoutchunk library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for layoutchunk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while turning analyzer output into chunks.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The analyzer content list is not valid JSON for the expected schema.
    #[error("Content list error: {0}")]
    Json(#[from] serde_json::Error),

    /// A raster could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Text and image sequences handed to the merger differ in length.
    #[error("Length mismatch: {texts} text sections but {images} images")]
    LengthMismatch {
        /// Number of text sections
        texts: usize,
        /// Number of images
        images: usize,
    },

    /// An option value is outside its allowed range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No `*_content_list.json` was found in the analyzer output directory.
    #[error("Content list not found under {}", .0.display())]
    ContentListNotFound(PathBuf),

    /// Error during rendering of chunk records.
    #[error("Rendering error: {0}")]
    Render(String),
}
