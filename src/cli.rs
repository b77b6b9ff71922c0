use crate::config::{DEFAULT_TEST_FRACTION, DEFAULT_TILE_SIZE};
use crate::coverage::DEFAULT_KEEP_THRESHOLD;
use crate::pairing::PairingRule;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mask-tiler")]
#[command(about = "Slice satellite image/mask pairs into training tiles and split them into train/test sets")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Number of threads (default: all available)
    #[arg(short, long, value_name = "N", global = true)]
    pub threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tile source images and masks into <OUTPUT>/Images and <OUTPUT>/Masks
    Build(BuildArgs),
    /// Move <ROOT>/Images and <ROOT>/Masks into Train/ and Test/ partitions
    Split(SplitArgs),
    /// Build, then split the result
    Run {
        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        split: SplitOptions,
    },
}

#[derive(ClapArgs, Debug)]
pub struct BuildArgs {
    /// Directory of source images
    #[arg(long, value_name = "DIR")]
    pub images: PathBuf,

    /// Directory of source masks
    #[arg(long, value_name = "DIR")]
    pub masks: PathBuf,

    /// Output root for the tile population
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Tile width in pixels
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_width: usize,

    /// Tile height in pixels
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_height: usize,

    /// Minimum foreground-to-background ratio for a tile to be kept
    #[arg(long, value_name = "RATIO", default_value_t = DEFAULT_KEEP_THRESHOLD)]
    pub keep_threshold: f64,

    /// Mask values above this count as foreground
    #[arg(long, value_name = "VALUE", default_value_t = 0.0)]
    pub foreground_epsilon: f32,

    /// Mask filename rule: same, trim:N or suffix:FROM:TO
    #[arg(long, value_name = "RULE", default_value = "same")]
    pub mask_rule: PairingRule,
}

#[derive(ClapArgs, Debug)]
pub struct SplitOptions {
    /// Fraction of tile pairs moved to the test set
    #[arg(long, value_name = "RATIO", default_value_t = DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,

    /// Extra folder level under each Images/Masks destination (e.g. "samples")
    #[arg(long, value_name = "NAME")]
    pub class_subdir: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct SplitArgs {
    /// Dataset root containing Images/ and Masks/
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    #[command(flatten)]
    pub options: SplitOptions,
}
