//! Rasterisation of an interpolated grid into filled contour bands.
//!
//! The grid is upsampled bilinearly by an integer factor, then each pixel is
//! painted with the colour of the band its value falls in. Pixels that are not
//! finite, or fall outside the outermost levels, stay transparent.

use rayon::prelude::*;

use radex_grid::Grid2;

use crate::colormap::Color;
use crate::error::{RenderError, Result};
use crate::levels::ContourLevels;

/// Bilinear resample of a row-major grid.
///
/// A destination sample is NaN when any source cell with non-zero weight is
/// NaN, so masked regions keep their outline instead of bleeding.
pub fn resample_grid(
    data: &[f64],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> Vec<f64> {
    if src_width == dst_width && src_height == dst_height {
        return data.to_vec();
    }
    if src_width == 0 || src_height == 0 || data.len() < src_width * src_height {
        return vec![f64::NAN; dst_width * dst_height];
    }

    let ratio = |src: usize, dst: usize| {
        if src <= 1 || dst <= 1 {
            0.0
        } else {
            (src - 1) as f64 / (dst - 1) as f64
        }
    };
    let x_ratio = ratio(src_width, dst_width);
    let y_ratio = ratio(src_height, dst_height);

    let mut output = vec![f64::NAN; dst_width * dst_height];
    output
        .par_chunks_mut(dst_width.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            let src_y = y as f64 * y_ratio;
            let y1 = (src_y.floor() as usize).min(src_height - 1);
            let y2 = (y1 + 1).min(src_height - 1);
            let dy = src_y - y1 as f64;

            for (x, out) in row.iter_mut().enumerate() {
                let src_x = x as f64 * x_ratio;
                let x1 = (src_x.floor() as usize).min(src_width - 1);
                let x2 = (x1 + 1).min(src_width - 1);
                let dx = src_x - x1 as f64;

                let corners = [
                    (y1 * src_width + x1, (1.0 - dx) * (1.0 - dy)),
                    (y1 * src_width + x2, dx * (1.0 - dy)),
                    (y2 * src_width + x1, (1.0 - dx) * dy),
                    (y2 * src_width + x2, dx * dy),
                ];

                let mut value = 0.0;
                for (idx, weight) in corners {
                    if weight <= 0.0 {
                        continue;
                    }
                    let v = data.get(idx).copied().unwrap_or(f64::NAN);
                    if !v.is_finite() {
                        value = f64::NAN;
                        break;
                    }
                    value += v * weight;
                }
                *out = value;
            }
        });

    output
}

/// Paint `grid` into RGBA pixels, `scale` pixels per grid cell on each axis.
///
/// Grid row 0 lands at the bottom of the image. Returns
/// `(pixels, width, height)`.
pub fn rasterize(
    grid: &Grid2,
    levels: &ContourLevels,
    colors: &[Color],
    scale: usize,
) -> Result<(Vec<u8>, usize, usize)> {
    if grid.width == 0 || grid.height == 0 || grid.data.len() != grid.width * grid.height {
        return Err(RenderError::EmptyGrid {
            width: grid.width,
            height: grid.height,
        });
    }
    if scale == 0 {
        return Err(RenderError::InvalidOptions(
            "pixel scale must be at least 1".to_string(),
        ));
    }
    if colors.len() != levels.band_count() {
        return Err(RenderError::InvalidOptions(format!(
            "{} colours for {} bands",
            colors.len(),
            levels.band_count()
        )));
    }

    let width = grid.width * scale;
    let height = grid.height * scale;
    let values = resample_grid(&grid.data, grid.width, grid.height, width, height);

    let mut pixels = vec![0u8; width * height * 4];
    pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(image_row, out)| {
            let src_row = height - 1 - image_row;
            let src = &values[src_row * width..(src_row + 1) * width];
            for (px, &v) in out.chunks_exact_mut(4).zip(src) {
                let color = levels
                    .band_index(v)
                    .map(|band| colors[band])
                    .unwrap_or_else(Color::transparent);
                px.copy_from_slice(&color.rgba());
            }
        });

    Ok((pixels, width, height))
}
