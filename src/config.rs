use crate::coverage::CoverageFilter;
use crate::error::{Result, TilerError};
use std::path::{Path, PathBuf};

pub const DEFAULT_TILE_SIZE: usize = 256;
pub const DEFAULT_TEST_FRACTION: f64 = 0.3;

pub const IMAGES_DIR: &str = "Images";
pub const MASKS_DIR: &str = "Masks";
pub const TRAIN_DIR: &str = "Train";
pub const TEST_DIR: &str = "Test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    pub tile_height: usize,
    pub tile_width: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_height: DEFAULT_TILE_SIZE,
            tile_width: DEFAULT_TILE_SIZE,
        }
    }
}

impl TileConfig {
    pub fn new(tile_height: usize, tile_width: usize) -> Result<Self> {
        if tile_height == 0 || tile_width == 0 {
            return Err(TilerError::InvalidDimensions("tile", tile_height, tile_width));
        }
        Ok(Self {
            tile_height,
            tile_width,
        })
    }
}

/// Inputs and outputs of one tiling run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source_images: PathBuf,
    pub source_masks: PathBuf,
    pub output_images: PathBuf,
    pub output_masks: PathBuf,
    pub tiles: TileConfig,
    pub coverage: CoverageFilter,
    pub show_progress: bool,
}

impl BuildConfig {
    /// Tiles go to `<output_root>/Images` and `<output_root>/Masks`.
    pub fn new(source_images: &Path, source_masks: &Path, output_root: &Path) -> Self {
        Self {
            source_images: source_images.to_path_buf(),
            source_masks: source_masks.to_path_buf(),
            output_images: output_root.join(IMAGES_DIR),
            output_masks: output_root.join(MASKS_DIR),
            tiles: TileConfig::default(),
            coverage: CoverageFilter::default(),
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub test_fraction: f64,
    /// Extra folder level under each `Images`/`Masks` destination, for loaders that
    /// expect one sub-folder per class.
    pub class_subdir: Option<String>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            class_subdir: None,
        }
    }
}

impl SplitConfig {
    pub fn new(test_fraction: f64, class_subdir: Option<String>) -> Result<Self> {
        validate_test_fraction(test_fraction)?;
        Ok(Self {
            test_fraction,
            class_subdir,
        })
    }
}

pub fn validate_test_fraction(test_fraction: f64) -> Result<()> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(TilerError::InvalidRatio(test_fraction));
    }
    Ok(())
}
