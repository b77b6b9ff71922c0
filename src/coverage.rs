use crate::error::{Result, TilerError};
use ndarray::Array2;

pub const DEFAULT_KEEP_THRESHOLD: f64 = 0.01;
pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Outcome of evaluating one binarized mask tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageDecision {
    pub keep: bool,
    /// White-to-black pixel ratio. `None` when the tile has no foreground,
    /// `f64::INFINITY` when it has no background.
    pub ratio: Option<f64>,
    pub white_pixels: usize,
    pub black_pixels: usize,
}

/// Keeps mask tiles whose foreground-to-background ratio reaches `keep_threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageFilter {
    pub keep_threshold: f64,
    /// A mask value strictly greater than this counts as foreground.
    pub foreground_epsilon: f32,
}

impl Default for CoverageFilter {
    fn default() -> Self {
        Self {
            keep_threshold: DEFAULT_KEEP_THRESHOLD,
            foreground_epsilon: 0.0,
        }
    }
}

impl CoverageFilter {
    pub fn new(keep_threshold: f64, foreground_epsilon: f32) -> Result<Self> {
        if !keep_threshold.is_finite() || keep_threshold < 0.0 {
            return Err(TilerError::InvalidThreshold("keep threshold", keep_threshold));
        }
        if !foreground_epsilon.is_finite() || foreground_epsilon < 0.0 {
            return Err(TilerError::InvalidThreshold(
                "foreground epsilon",
                foreground_epsilon as f64,
            ));
        }
        Ok(Self {
            keep_threshold,
            foreground_epsilon,
        })
    }

    /// Map every mask value to 255 (foreground) or 0 (background).
    pub fn binarize(&self, mask: &Array2<u8>) -> Array2<u8> {
        mask.mapv(|v| {
            if f32::from(v) > self.foreground_epsilon {
                FOREGROUND
            } else {
                BACKGROUND
            }
        })
    }

    /// Decide on a mask tile that has already been binarized.
    pub fn evaluate(&self, binary_mask: &Array2<u8>) -> CoverageDecision {
        let white_pixels = binary_mask.iter().filter(|&&v| v == FOREGROUND).count();
        let black_pixels = binary_mask.len() - white_pixels;

        if white_pixels == 0 {
            return CoverageDecision {
                keep: false,
                ratio: None,
                white_pixels,
                black_pixels,
            };
        }

        let ratio = if black_pixels == 0 {
            f64::INFINITY
        } else {
            white_pixels as f64 / black_pixels as f64
        };

        CoverageDecision {
            keep: ratio >= self.keep_threshold,
            ratio: Some(ratio),
            white_pixels,
            black_pixels,
        }
    }
}
