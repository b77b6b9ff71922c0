use clap::Parser;
use env_logger::Env;
use log::info;

use mask_tiler::cli::{Args, BuildArgs, Command, SplitOptions};
use mask_tiler::{
    split_dataset, BuildConfig, CoverageFilter, DatasetBuilder, Result, SplitConfig, TileConfig,
};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== Mask Tiler ===");

    // Set thread pool size if specified
    if let Some(n_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global()
            .expect("Failed to build thread pool");
        info!("Using {} threads", n_threads);
    } else {
        info!("Using all available threads");
    }

    let show_progress = !args.no_progress;
    match args.command {
        Command::Build(build) => run_build(&build, show_progress)?,
        Command::Split(split) => run_split(&split.root, &split.options)?,
        Command::Run { build, split } => {
            // Validate the split settings before spending time on tiling
            SplitConfig::new(split.test_fraction, split.class_subdir.clone())?;
            run_build(&build, show_progress)?;
            run_split(&build.output, &split)?;
        }
    }

    info!("=== Done! ===");
    Ok(())
}

fn run_build(build: &BuildArgs, show_progress: bool) -> Result<()> {
    let mut config = BuildConfig::new(&build.images, &build.masks, &build.output);
    config.tiles = TileConfig::new(build.tile_height, build.tile_width)?;
    config.coverage = CoverageFilter::new(build.keep_threshold, build.foreground_epsilon)?;
    config.show_progress = show_progress;

    info!("Source images: {}", build.images.display());
    info!("Source masks: {}", build.masks.display());
    info!("Mask pairing rule: {:?}", build.mask_rule);

    let report = DatasetBuilder::new(config, build.mask_rule.clone()).run()?;
    report.log_summary();
    Ok(())
}

fn run_split(root: &std::path::Path, options: &SplitOptions) -> Result<()> {
    let config = SplitConfig::new(options.test_fraction, options.class_subdir.clone())?;
    info!("Splitting {} (test fraction {})", root.display(), config.test_fraction);

    let summary = split_dataset(root, &config)?;
    summary.log_summary();
    Ok(())
}
