// Library exports for testing and reuse

pub mod builder;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod grid;
pub mod io;
pub mod pairing;
pub mod partition;

// Re-export commonly used types
pub use builder::{BuildReport, DatasetBuilder, SkippedSource};
pub use config::{BuildConfig, SplitConfig, TileConfig};
pub use coverage::{CoverageDecision, CoverageFilter};
pub use error::{Result, TilerError};
pub use extract::{extract_tile, Tile};
pub use grid::{CropWindow, TileGrid};
pub use io::{read_source_image, read_source_mask, SourceImage, SourceMask};
pub use pairing::{MaskPairing, PairingRule};
pub use partition::{split_dataset, Partition, PartitionLayout, PartitionPlan, PartitionSummary};
