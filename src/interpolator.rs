use std::num::NonZeroU32;

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::enums::Interpolation;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Size in pixels a `(rows, cols)` cell occupies when drawn into a
    /// `cell_size` square, with columns stretched by `aspect`.
    pub(crate) fn fitted_dimensions(
        (rows, cols): (usize, usize),
        aspect: f32,
        cell_size: NonZeroU32,
    ) -> (u32, u32) {
        let cell_size = cell_size.get();
        let width = cols as f32 * aspect;
        let height = rows as f32;
        let longest = width.max(height);
        if longest <= 0.0 || !longest.is_finite() {
            return (0, 0);
        }
        let scale = cell_size as f32 / longest;
        let fit = |extent: f32| ((extent * scale).round() as u32).clamp(1, cell_size);
        (fit(height), fit(width))
    }

    /// Resample `slice` onto a `height` x `width` grid.
    pub(crate) fn resample(
        slice: &ArrayView2<f32>,
        height: u32,
        width: u32,
        interpolation: Interpolation,
    ) -> Array2<f32> {
        let (slice_height, slice_width) = slice.dim();
        let (height, width) = (height as usize, width as usize);
        if slice_height == 0 || slice_width == 0 || height == 0 || width == 0 {
            return Array2::zeros((height, width));
        }

        let values: Vec<f32> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).map(move |x| {
                    // Sample at pixel centres
                    let norm_x = (x as f32 + 0.5) / width as f32;
                    let norm_y = (y as f32 + 0.5) / height as f32;

                    let src_x = (norm_x * slice_width as f32 - 0.5)
                        .max(0.0)
                        .min((slice_width - 1) as f32);
                    let src_y = (norm_y * slice_height as f32 - 0.5)
                        .max(0.0)
                        .min((slice_height - 1) as f32);

                    match interpolation {
                        Interpolation::Bilinear => Self::bilinear_interpolate(slice, src_y, src_x),
                        Interpolation::None => {
                            slice[[src_y.round() as usize, src_x.round() as usize]]
                        }
                    }
                })
            })
            .collect();

        Array2::from_shape_vec((height, width), values)
            .unwrap_or_else(|_| Array2::zeros((height, width)))
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }
}
