use crate::error::{Result, TilerError};
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, RasterBand};
use gdal::{Dataset, DriverManager};
use log::debug;
use ndarray::{Array2, Array3, Axis};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGE_CHANNELS: usize = 3;

/// A 3-channel 8-bit source raster, shape (height, width, 3).
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub pixels: Array3<u8>,
}

/// A single-channel source mask, shape (height, width).
#[derive(Debug, Clone)]
pub struct SourceMask {
    pub path: PathBuf,
    pub pixels: Array2<u8>,
}

impl SourceImage {
    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        let (height, width, _) = self.pixels.dim();
        (height, width)
    }
}

impl SourceMask {
    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        self.pixels.dim()
    }
}

fn source_error(path: &Path, err: TilerError) -> TilerError {
    TilerError::SourceRead {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn read_band(band: &RasterBand, width: usize, height: usize) -> Result<Array2<u8>> {
    let buffer = band.read_as::<u8>((0, 0), (width, height), (width, height), None)?;
    let data_vec: Vec<u8> = buffer.into_iter().collect();
    Ok(Array2::from_shape_vec((height, width), data_vec)?)
}

fn open_raster(path: &Path) -> Result<(Dataset, usize, usize)> {
    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();

    if width == 0 || height == 0 {
        return Err(TilerError::InvalidDimensions("raster", height, width));
    }

    Ok((dataset, width, height))
}

/// Read a source image. Single-band rasters are replicated into three channels and
/// bands past the third are ignored.
pub fn read_source_image(path: &Path) -> Result<SourceImage> {
    let read = || -> Result<Array3<u8>> {
        let (dataset, width, height) = open_raster(path)?;
        let band_count = dataset.raster_count() as usize;
        debug!(
            "Image {}: {}x{}, {} band(s)",
            path.display(),
            width,
            height,
            band_count
        );

        let mut pixels = Array3::<u8>::zeros((height, width, IMAGE_CHANNELS));
        for channel in 0..IMAGE_CHANNELS {
            let band_index = if band_count >= IMAGE_CHANNELS { channel + 1 } else { 1 };
            let band = dataset.rasterband(band_index)?;
            let data = read_band(&band, width, height)?;
            pixels.index_axis_mut(Axis(2), channel).assign(&data);
        }
        Ok(pixels)
    };

    let pixels = read().map_err(|e| source_error(path, e))?;
    Ok(SourceImage {
        path: path.to_path_buf(),
        pixels,
    })
}

/// Read band 1 of a source mask.
pub fn read_source_mask(path: &Path) -> Result<SourceMask> {
    let read = || -> Result<Array2<u8>> {
        let (dataset, width, height) = open_raster(path)?;
        debug!("Mask {}: {}x{}", path.display(), width, height);
        let band = dataset.rasterband(1)?;
        read_band(&band, width, height)
    };

    let pixels = read().map_err(|e| source_error(path, e))?;
    Ok(SourceMask {
        path: path.to_path_buf(),
        pixels,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileFormat {
    GTiff,
    Png,
    Jpeg,
}

impl TileFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tif" | "tiff" => Some(TileFormat::GTiff),
            "png" => Some(TileFormat::Png),
            "jpg" | "jpeg" => Some(TileFormat::Jpeg),
            _ => None,
        }
    }

    fn driver_name(self) -> &'static str {
        match self {
            TileFormat::GTiff => "GTiff",
            TileFormat::Png => "PNG",
            TileFormat::Jpeg => "JPEG",
        }
    }
}

/// Write one `u8` raster band per entry of `bands`, picking the GDAL driver from the
/// file extension. PNG and JPEG drivers cannot create rasters directly, so those are
/// staged in memory and copied out.
fn write_bands(path: &Path, bands: &[Array2<u8>]) -> Result<()> {
    let format = TileFormat::from_path(path)
        .ok_or_else(|| TilerError::UnsupportedFormat(path.to_path_buf()))?;
    let (height, width) = bands[0].dim();

    let target = DriverManager::get_driver_by_name(format.driver_name())?;
    let mut dataset = if format == TileFormat::GTiff {
        target.create_with_band_type::<u8, _>(path, width, height, bands.len())?
    } else {
        let mem = DriverManager::get_driver_by_name("MEM")?;
        mem.create_with_band_type::<u8, _>("", width, height, bands.len())?
    };

    for (i, band_data) in bands.iter().enumerate() {
        let mut raster_band = dataset.rasterband(i + 1)?;
        let data: Vec<u8> = band_data.iter().copied().collect();
        let mut buffer = Buffer::new((width, height), data);
        raster_band.write((0, 0), (width, height), &mut buffer)?;
    }

    if format != TileFormat::GTiff {
        dataset.create_copy(&target, path, &CslStringList::new())?;
    }

    debug!("Wrote {} band(s) to {}", bands.len(), path.display());
    Ok(())
}

/// Fail unless tiles named like `path` can be written.
pub fn check_tile_format(path: &Path) -> Result<()> {
    TileFormat::from_path(path)
        .map(|_| ())
        .ok_or_else(|| TilerError::UnsupportedFormat(path.to_path_buf()))
}

/// Write a (height, width, 3) image tile.
pub fn write_image_tile(path: &Path, image: &Array3<u8>) -> Result<()> {
    let bands: Vec<Array2<u8>> = image
        .axis_iter(Axis(2))
        .map(|channel| channel.to_owned())
        .collect();
    write_bands(path, &bands)
}

/// Write a single-band mask tile.
pub fn write_mask_tile(path: &Path, mask: &Array2<u8>) -> Result<()> {
    write_bands(path, std::slice::from_ref(mask))
}

/// Names of the regular files directly under `dir`, sorted by their raw bytes.
pub fn list_entries(dir: &Path) -> Result<Vec<OsString>> {
    let list_error = |source| TilerError::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        if !entry.file_type().map_err(list_error)?.is_file() {
            continue;
        }
        names.push(entry.file_name());
    }
    names.sort_unstable();
    Ok(names)
}

/// Like [`list_entries`], but every name must be valid UTF-8.
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    list_entries(dir)?
        .into_iter()
        .map(|name| {
            name.into_string()
                .map_err(|raw| TilerError::NonUtf8FileName(dir.join(raw)))
        })
        .collect()
}
