use crate::error::{Result, TilerError};
use log::debug;

/// A tile-sized window over a source raster. Windows on the last row or column may
/// extend past the raster; they are not clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub row_offset: usize,
    pub col_offset: usize,
    pub height: usize,
    pub width: usize,
}

impl CropWindow {
    /// Rows of this window that fall inside a raster of `source_height` rows.
    pub fn valid_height(&self, source_height: usize) -> usize {
        self.height.min(source_height.saturating_sub(self.row_offset))
    }

    /// Columns of this window that fall inside a raster of `source_width` columns.
    pub fn valid_width(&self, source_width: usize) -> usize {
        self.width.min(source_width.saturating_sub(self.col_offset))
    }

    pub fn is_boundary(&self, source_height: usize, source_width: usize) -> bool {
        self.row_offset + self.height > source_height || self.col_offset + self.width > source_width
    }
}

pub struct TileGrid {
    tile_height: usize,
    tile_width: usize,
    pub num_rows: usize,
    pub num_cols: usize,
    pub total_windows: usize,
}

impl TileGrid {
    pub fn new(
        raster_height: usize,
        raster_width: usize,
        tile_height: usize,
        tile_width: usize,
    ) -> Result<Self> {
        if raster_height == 0 || raster_width == 0 {
            return Err(TilerError::InvalidDimensions(
                "raster",
                raster_height,
                raster_width,
            ));
        }
        if tile_height == 0 || tile_width == 0 {
            return Err(TilerError::InvalidDimensions("tile", tile_height, tile_width));
        }

        let num_rows = raster_height.div_ceil(tile_height);
        let num_cols = raster_width.div_ceil(tile_width);
        let total_windows = num_rows * num_cols;

        debug!(
            "TileGrid: {}x{} raster, tile {}x{} → {}x{} windows ({} total)",
            raster_height, raster_width, tile_height, tile_width, num_rows, num_cols, total_windows
        );

        Ok(Self {
            tile_height,
            tile_width,
            num_rows,
            num_cols,
            total_windows,
        })
    }

    pub fn iter(&self) -> WindowIterator<'_> {
        WindowIterator::new(self)
    }

    /// Window at a row-major linear index.
    pub fn window(&self, window_idx: usize) -> CropWindow {
        let row = window_idx / self.num_cols;
        let col = window_idx % self.num_cols;

        CropWindow {
            row_offset: row * self.tile_height,
            col_offset: col * self.tile_width,
            height: self.tile_height,
            width: self.tile_width,
        }
    }
}

pub struct WindowIterator<'a> {
    grid: &'a TileGrid,
    current_idx: usize,
}

impl<'a> WindowIterator<'a> {
    fn new(grid: &'a TileGrid) -> Self {
        Self {
            grid,
            current_idx: 0,
        }
    }
}

impl<'a> Iterator for WindowIterator<'a> {
    type Item = (usize, CropWindow);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_idx < self.grid.total_windows {
            let window = self.grid.window(self.current_idx);
            let idx = self.current_idx;
            self.current_idx += 1;
            Some((idx, window))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.total_windows - self.current_idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowIterator<'_> {}
