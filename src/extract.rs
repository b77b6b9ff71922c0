use crate::error::{Result, TilerError};
use crate::grid::CropWindow;
use crate::io::{SourceImage, SourceMask, IMAGE_CHANNELS};
use log::debug;
use ndarray::{s, Array2, Array3};

/// A fixed-size image/mask crop. Regions outside the source are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub image: Array3<u8>,
    pub mask: Array2<u8>,
}

impl Tile {
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            image: Array3::zeros((height, width, IMAGE_CHANNELS)),
            mask: Array2::zeros((height, width)),
        }
    }

    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        self.mask.dim()
    }
}

/// Fail unless image and mask cover the same pixel grid.
pub fn check_pair(image: &SourceImage, mask: &SourceMask) -> Result<()> {
    if image.dims() != mask.dims() {
        return Err(TilerError::MismatchedDimensions {
            image: image.path.clone(),
            mask: mask.path.clone(),
            image_dims: image.dims(),
            mask_dims: mask.dims(),
        });
    }
    Ok(())
}

/// Copy the part of `window` that lies inside the source into the top-left corner of
/// a zeroed tile of the window's size.
pub fn extract_tile(image: &SourceImage, mask: &SourceMask, window: &CropWindow) -> Result<Tile> {
    check_pair(image, mask)?;

    let (source_height, source_width) = image.dims();
    let valid_height = window.valid_height(source_height);
    let valid_width = window.valid_width(source_width);

    let mut tile = Tile::zeros(window.height, window.width);
    if valid_height == 0 || valid_width == 0 {
        return Ok(tile);
    }

    let rows = window.row_offset..window.row_offset + valid_height;
    let cols = window.col_offset..window.col_offset + valid_width;

    tile.image
        .slice_mut(s![..valid_height, ..valid_width, ..])
        .assign(&image.pixels.slice(s![rows.clone(), cols.clone(), ..]));
    tile.mask
        .slice_mut(s![..valid_height, ..valid_width])
        .assign(&mask.pixels.slice(s![rows, cols]));

    if valid_height < window.height || valid_width < window.width {
        debug!(
            "Padded window at ({}, {}): {}x{} of {}x{} from source",
            window.row_offset, window.col_offset, valid_height, valid_width, window.height, window.width
        );
    }

    Ok(tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileGrid;
    use std::path::PathBuf;

    fn source_pair(height: usize, width: usize) -> (SourceImage, SourceMask) {
        let image = SourceImage {
            path: PathBuf::from("scene.tif"),
            pixels: Array3::from_shape_fn((height, width, 3), |(r, c, ch)| {
                ((r * 7 + c * 3 + ch) % 250 + 1) as u8
            }),
        };
        let mask = SourceMask {
            path: PathBuf::from("scene_mask.tif"),
            pixels: Array2::from_shape_fn((height, width), |(r, c)| ((r + c) % 2) as u8),
        };
        (image, mask)
    }

    #[test]
    fn test_interior_window_is_exact_crop() {
        let (image, mask) = source_pair(10, 12);
        let window = CropWindow {
            row_offset: 2,
            col_offset: 4,
            height: 5,
            width: 6,
        };
        let tile = extract_tile(&image, &mask, &window).unwrap();

        assert_eq!(tile.dims(), (5, 6));
        assert_eq!(tile.image, image.pixels.slice(s![2..7, 4..10, ..]));
        assert_eq!(tile.mask, mask.pixels.slice(s![2..7, 4..10]));
    }

    #[test]
    fn test_boundary_window_is_zero_padded() {
        let (image, mask) = source_pair(10, 12);
        let window = CropWindow {
            row_offset: 8,
            col_offset: 8,
            height: 5,
            width: 6,
        };
        let tile = extract_tile(&image, &mask, &window).unwrap();
        assert_eq!(tile.dims(), (5, 6));

        // 2 rows x 4 cols come from the source
        assert_eq!(
            tile.image.slice(s![..2, ..4, ..]),
            image.pixels.slice(s![8..10, 8..12, ..])
        );
        assert_eq!(tile.mask.slice(s![..2, ..4]), mask.pixels.slice(s![8..10, 8..12]));

        assert!(tile.image.slice(s![2.., .., ..]).iter().all(|&v| v == 0));
        assert!(tile.image.slice(s![.., 4.., ..]).iter().all(|&v| v == 0));
        assert!(tile.mask.slice(s![2.., ..]).iter().all(|&v| v == 0));
        assert!(tile.mask.slice(s![.., 4..]).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_every_grid_tile_has_fixed_shape() {
        let (image, mask) = source_pair(300, 300);
        let grid = TileGrid::new(300, 300, 256, 256).unwrap();
        for (_, window) in grid.iter() {
            let tile = extract_tile(&image, &mask, &window).unwrap();
            assert_eq!(tile.image.dim(), (256, 256, 3));
            assert_eq!(tile.mask.dim(), (256, 256));
        }
    }

    #[test]
    fn test_window_outside_source_is_all_zero() {
        let (image, mask) = source_pair(4, 4);
        let window = CropWindow {
            row_offset: 8,
            col_offset: 0,
            height: 4,
            width: 4,
        };
        let tile = extract_tile(&image, &mask, &window).unwrap();
        assert_eq!(tile, Tile::zeros(4, 4));
    }

    #[test]
    fn test_mismatched_pair_is_rejected() {
        let (image, _) = source_pair(10, 12);
        let (_, mask) = source_pair(10, 11);
        let window = CropWindow {
            row_offset: 0,
            col_offset: 0,
            height: 4,
            width: 4,
        };
        let err = extract_tile(&image, &mask, &window).unwrap_err();
        assert!(matches!(
            err,
            TilerError::MismatchedDimensions {
                image_dims: (10, 12),
                mask_dims: (10, 11),
                ..
            }
        ));
    }
}
