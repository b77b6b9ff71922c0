use crate::config::{BuildConfig, TileConfig};
use crate::error::{Result, TilerError};
use crate::extract::{check_pair, extract_tile};
use crate::grid::TileGrid;
use crate::io::{
    check_tile_format, list_entries, read_source_image, read_source_mask, write_image_tile,
    write_mask_tile,
};
use crate::pairing::MaskPairing;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// A source image that was left out of the run, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub sources_total: usize,
    pub sources_processed: usize,
    pub skipped_sources: Vec<SkippedSource>,
    pub tiles_accepted: usize,
    pub tiles_skipped: usize,
    pub elapsed: Duration,
    pub output_images: PathBuf,
    pub output_masks: PathBuf,
}

impl BuildReport {
    pub fn log_summary(&self) {
        info!(
            "Export complete in {:.2} s: {} of {} source images tiled",
            self.elapsed.as_secs_f64(),
            self.sources_processed,
            self.sources_total
        );
        info!(
            "Tiles accepted: {}, tiles skipped: {}",
            self.tiles_accepted, self.tiles_skipped
        );
        info!("Images exported to {}", self.output_images.display());
        info!("Masks exported to {}", self.output_masks.display());
        if !self.skipped_sources.is_empty() {
            warn!("{} source images were skipped:", self.skipped_sources.len());
            for skipped in &self.skipped_sources {
                warn!("  {}: {}", skipped.path.display(), skipped.reason);
            }
        }
    }
}

#[derive(Debug)]
enum SourceOutcome {
    Tiled { accepted: usize, skipped: usize },
    Skipped(SkippedSource),
}

/// Tiles every image under the source directory and writes the accepted pairs.
pub struct DatasetBuilder<P> {
    config: BuildConfig,
    pairing: P,
}

impl<P: MaskPairing + Sync> DatasetBuilder<P> {
    pub fn new(config: BuildConfig, pairing: P) -> Self {
        Self { config, pairing }
    }

    pub fn run(&self) -> Result<BuildReport> {
        let start = Instant::now();
        let tiles = TileConfig::new(self.config.tiles.tile_height, self.config.tiles.tile_width)?;

        for dir in [&self.config.output_images, &self.config.output_masks] {
            fs::create_dir_all(dir).map_err(|e| TilerError::Write {
                path: dir.clone(),
                tiles_written: 0,
                reason: e.to_string(),
            })?;
            debug!("Output directory ready: {}", dir.display());
        }

        let sources = list_entries(&self.config.source_images)?;
        info!(
            "Building dataset from {} source images in {} ({}x{} tiles)",
            sources.len(),
            self.config.source_images.display(),
            tiles.tile_height,
            tiles.tile_width
        );

        let progress = self.progress_bar(sources.len());
        let tiles_written = AtomicUsize::new(0);

        let outcomes = sources
            .par_iter()
            .map(|name| {
                let outcome = match self.process_source(name, &tiles, &tiles_written) {
                    Ok(outcome) => Ok(outcome),
                    Err(e) if e.is_recoverable() => {
                        warn!("Skipping source {}: {}", name.to_string_lossy(), e);
                        Ok(SourceOutcome::Skipped(SkippedSource {
                            path: self.config.source_images.join(name),
                            reason: e.to_string(),
                        }))
                    }
                    Err(e) => Err(e),
                };
                progress.inc(1);
                outcome
            })
            .collect::<Result<Vec<_>>>();
        progress.finish_and_clear();
        let outcomes = outcomes?;

        let mut report = BuildReport {
            sources_total: sources.len(),
            sources_processed: 0,
            skipped_sources: Vec::new(),
            tiles_accepted: 0,
            tiles_skipped: 0,
            elapsed: Duration::ZERO,
            output_images: self.config.output_images.clone(),
            output_masks: self.config.output_masks.clone(),
        };
        for outcome in outcomes {
            match outcome {
                SourceOutcome::Tiled { accepted, skipped } => {
                    report.sources_processed += 1;
                    report.tiles_accepted += accepted;
                    report.tiles_skipped += skipped;
                }
                SourceOutcome::Skipped(skipped) => report.skipped_sources.push(skipped),
            }
        }
        report.elapsed = start.elapsed();

        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len as u64).with_style(style)
    }

    /// Tile one source pair. Returns accepted/skipped counts; naming, read and pairing
    /// errors come back as recoverable, write errors as fatal.
    fn process_source(
        &self,
        name: &OsStr,
        tiles: &TileConfig,
        tiles_written: &AtomicUsize,
    ) -> Result<SourceOutcome> {
        let image_path = self.config.source_images.join(name);
        let name = name.to_str().ok_or_else(|| TilerError::SourceRead {
            path: image_path.clone(),
            reason: "non-UTF-8 filename".to_string(),
        })?;
        check_tile_format(&image_path)?;

        let mask_name = self
            .pairing
            .mask_name(name)
            .ok_or_else(|| TilerError::SourceRead {
                path: image_path.clone(),
                reason: "no mask filename can be derived".to_string(),
            })?;
        let mask_path = self.config.source_masks.join(mask_name);

        let image = read_source_image(&image_path)?;
        let mask = read_source_mask(&mask_path)?;
        check_pair(&image, &mask)?;

        let (height, width) = image.dims();
        let grid = TileGrid::new(height, width, tiles.tile_height, tiles.tile_width)?;
        let coverage = &self.config.coverage;

        let mut accepted = 0;
        let mut skipped = 0;
        for (idx, window) in grid.iter() {
            let mut tile = extract_tile(&image, &mask, &window)?;
            tile.mask = coverage.binarize(&tile.mask);

            let decision = coverage.evaluate(&tile.mask);
            if !decision.keep {
                debug!(
                    "{} window {}: skipped (white={}, black={}, ratio={:?})",
                    name,
                    idx + 1,
                    decision.white_pixels,
                    decision.black_pixels,
                    decision.ratio
                );
                skipped += 1;
                continue;
            }

            let tile_name = format!("{}_{}", idx + 1, name);
            let image_out = self.config.output_images.join(&tile_name);
            let mask_out = self.config.output_masks.join(&tile_name);
            write_image_tile(&image_out, &tile.image)
                .map_err(|e| write_error(&image_out, tiles_written, e))?;
            write_mask_tile(&mask_out, &tile.mask)
                .map_err(|e| write_error(&mask_out, tiles_written, e))?;
            tiles_written.fetch_add(1, Ordering::Relaxed);
            accepted += 1;
        }

        debug!(
            "{}: {} windows, {} accepted, {} skipped",
            name, grid.total_windows, accepted, skipped
        );
        Ok(SourceOutcome::Tiled { accepted, skipped })
    }
}

fn write_error(path: &Path, tiles_written: &AtomicUsize, err: TilerError) -> TilerError {
    TilerError::Write {
        path: path.to_path_buf(),
        tiles_written: tiles_written.load(Ordering::Relaxed),
        reason: err.to_string(),
    }
}
