use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TilerError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Invalid {0} dimensions: {1}x{2} (height x width, must be positive)")]
    InvalidDimensions(&'static str, usize, usize),

    #[error("Invalid {0}: {1} (must be finite and non-negative)")]
    InvalidThreshold(&'static str, f64),

    #[error("Invalid test fraction: {0} (must be in [0, 1))")]
    InvalidRatio(f64),

    #[error("Invalid mask pairing rule: {0:?} (expected same, trim:N or suffix:FROM:TO)")]
    InvalidPairingRule(String),

    #[error("Cannot list directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File name is not valid UTF-8: {0}")]
    NonUtf8FileName(PathBuf),

    #[error("Unsupported tile format for {0} (expected tif, tiff, png, jpg or jpeg)")]
    UnsupportedFormat(PathBuf),

    #[error("Cannot read source {path}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    #[error(
        "Image {image} is {image_dims:?} but its mask {mask} is {mask_dims:?} (height, width)"
    )]
    MismatchedDimensions {
        image: PathBuf,
        mask: PathBuf,
        image_dims: (usize, usize),
        mask_dims: (usize, usize),
    },

    #[error("Failed to write tile {path} ({tiles_written} tiles written before failure): {reason}")]
    Write {
        path: PathBuf,
        tiles_written: usize,
        reason: String,
    },

    #[error("No paired file for {path} ({relocated} pairs relocated before failure)")]
    MissingPairedFile { path: PathBuf, relocated: usize },

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Failed to move {from} to {to} ({relocated} pairs relocated before failure): {source}")]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        relocated: usize,
        source: std::io::Error,
    },
}

impl TilerError {
    /// Errors scoped to a single source pair; the batch continues past them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TilerError::SourceRead { .. }
                | TilerError::MismatchedDimensions { .. }
                | TilerError::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TilerError>;
