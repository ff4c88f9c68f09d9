//! Row configuration and the rows × 3 figure grid.

use std::num::NonZeroU32;

use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3, Axis};
use serde::Deserialize;
use tracing::debug;

use crate::enums::{Interpolation, Orientation};
use crate::error::{FigureError, Result};
use crate::extractor::{self, Slice};
use crate::interpolator::Interpolator;
use crate::repository::VolumeAccessor;
use crate::volume::Volume;

pub const DEFAULT_VMAX_PERCENTILE: f32 = 98.0;
pub const DEFAULT_PADDING: usize = 1;

/// Display options for one derivative within a panel.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RowConfig")]
pub struct Row {
    name: String,
    vmax: Option<f32>,
    vmax_percentile: f32,
    padding: usize,
}

impl Row {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vmax: None,
            vmax_percentile: DEFAULT_VMAX_PERCENTILE,
            padding: DEFAULT_PADDING,
        }
    }

    /// Saturate at a fixed intensity instead of a percentile.
    pub fn with_vmax(mut self, vmax: f32) -> Result<Self> {
        if !vmax.is_finite() || vmax <= 0.0 {
            return Err(self.invalid(format!("vmax must be a positive number, got {vmax}")));
        }
        self.vmax = Some(vmax);
        Ok(self)
    }

    pub fn with_vmax_percentile(mut self, percentile: f32) -> Result<Self> {
        if !(0.0..=100.0).contains(&percentile) {
            return Err(self.invalid(format!(
                "vmax_percentile must lie in [0, 100], got {percentile}"
            )));
        }
        self.vmax_percentile = percentile;
        Ok(self)
    }

    /// Border in voxels kept around the nonzero region when cropping.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vmax(&self) -> Option<f32> {
        self.vmax
    }

    pub fn vmax_percentile(&self) -> f32 {
        self.vmax_percentile
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Window for `cropped`: explicit vmax, or the configured percentile of
    /// the cropped intensities.
    pub fn window(&self, cropped: &Volume) -> IntensityWindow {
        let vmax = self
            .vmax
            .unwrap_or_else(|| cropped.percentile(self.vmax_percentile));
        IntensityWindow { vmin: 0.0, vmax }
    }

    fn invalid(&self, message: String) -> FigureError {
        FigureError::InvalidRow {
            name: self.name.clone(),
            message,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RowConfig {
    name: String,
    #[serde(default)]
    vmax: Option<f32>,
    #[serde(default = "default_vmax_percentile")]
    vmax_percentile: f32,
    #[serde(default = "default_padding")]
    padding: usize,
}

fn default_vmax_percentile() -> f32 {
    DEFAULT_VMAX_PERCENTILE
}

fn default_padding() -> usize {
    DEFAULT_PADDING
}

impl TryFrom<RowConfig> for Row {
    type Error = FigureError;

    fn try_from(config: RowConfig) -> Result<Self> {
        let row = Row::new(config.name)
            .with_vmax_percentile(config.vmax_percentile)?
            .with_padding(config.padding);
        match config.vmax {
            Some(vmax) => row.with_vmax(vmax),
            None => Ok(row),
        }
    }
}

/// Intensities mapped to black (`vmin`) and white (`vmax`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntensityWindow {
    pub vmin: f32,
    pub vmax: f32,
}

impl IntensityWindow {
    #[inline]
    pub fn to_u8(&self, value: f32) -> u8 {
        let span = self.vmax - self.vmin;
        if span <= f32::EPSILON {
            return if value > self.vmin { u8::MAX } else { 0 };
        }
        (((value - self.vmin) / span) * 255.0).clamp(0.0, 255.0) as u8
    }
}

#[derive(Clone, Debug)]
pub enum CellPixels {
    /// Scalar slice drawn in greyscale through its row's window
    Gray {
        data: Array2<f32>,
        window: IntensityWindow,
    },
    /// (height, width, 3) capture drawn as is
    Rgb(Array3<u8>),
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub orientation: Orientation,
    /// Physical width of one pixel over its height
    pub aspect: f32,
    pub pixels: CellPixels,
}

impl Cell {
    /// (rows, columns) of the padded canvas
    pub fn dim(&self) -> (usize, usize) {
        match &self.pixels {
            CellPixels::Gray { data, .. } => data.dim(),
            CellPixels::Rgb(data) => (data.len_of(Axis(0)), data.len_of(Axis(1))),
        }
    }

    /// Colour channels scaled to 0..=255, before windowing for greyscale.
    fn channels(&self) -> Vec<Array2<f32>> {
        match &self.pixels {
            CellPixels::Gray { data, .. } => vec![data.clone()],
            CellPixels::Rgb(data) => data
                .axis_iter(Axis(2))
                .map(|channel| channel.mapv(f32::from))
                .collect(),
        }
    }

    fn shade(&self, values: &[f32]) -> Rgb<u8> {
        match &self.pixels {
            CellPixels::Gray { window, .. } => {
                let level = window.to_u8(values[0]);
                Rgb([level, level, level])
            }
            CellPixels::Rgb(_) => {
                let channel = |c: usize| values.get(c).copied().unwrap_or(0.0).clamp(0.0, 255.0) as u8;
                Rgb([channel(0), channel(1), channel(2)])
            }
        }
    }
}

/// An assembled grid of cells, one column per orientation.
#[derive(Clone, Debug, Default)]
pub struct Figure {
    rows: Vec<[Cell; 3]>,
}

impl Figure {
    pub fn new(rows: Vec<[Cell; 3]>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[Cell; 3]] {
        &self.rows
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), 3)
    }

    /// Rasterise with every cell drawn into a `cell_size` square, touching
    /// its neighbours. Cells keep their aspect ratio and are centred on
    /// black.
    pub fn render(&self, cell_size: NonZeroU32, interpolation: Interpolation) -> RgbImage {
        let side = cell_size.get();
        let mut image = RgbImage::new(3 * side, self.rows.len() as u32 * side);
        for (row_index, row) in self.rows.iter().enumerate() {
            for (column_index, cell) in row.iter().enumerate() {
                let (height, width) =
                    Interpolator::fitted_dimensions(cell.dim(), cell.aspect, cell_size);
                let channels: Vec<Array2<f32>> = cell
                    .channels()
                    .iter()
                    .map(|channel| Interpolator::resample(&channel.view(), height, width, interpolation))
                    .collect();
                let top = row_index as u32 * side + (side - height) / 2;
                let left = column_index as u32 * side + (side - width) / 2;
                let mut values = vec![0.0; channels.len()];
                for y in 0..height {
                    for x in 0..width {
                        for (value, channel) in values.iter_mut().zip(&channels) {
                            *value = channel[[y as usize, x as usize]];
                        }
                        image.put_pixel(left + x, top + y, cell.shade(&values));
                    }
                }
            }
        }
        image
    }
}

/// Build a panel with one row per entry of `rows`, read for one session.
pub fn build_panel(
    rows: &[Row],
    accessor: &dyn VolumeAccessor,
    subject_id: &str,
    visit_id: &str,
    offset: [isize; 3],
) -> Result<Figure> {
    let rows = rows
        .iter()
        .map(|row| {
            accessor
                .get(row.name(), subject_id, visit_id)
                .and_then(|volume| compose_row(row, volume, offset))
                .map_err(|error| error.in_row(row.name()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Figure::new(rows))
}

/// Crop, slice, pad and window one volume into a row of three cells.
pub fn compose_row(row: &Row, mut volume: Volume, offset: [isize; 3]) -> Result<[Cell; 3]> {
    volume.zero_nan();
    let cropped = volume.crop(row.padding())?;
    let slices = extractor::offset_slices(&cropped, offset)?;
    let canvas = extractor::square_canvas(slices.iter().map(Slice::dim));
    let window = row.window(&cropped);
    debug!(
        row = row.name(),
        cropped = ?cropped.dim(),
        canvas,
        vmax = window.vmax,
        "composed row"
    );

    let pad = |slice: Slice| -> Result<Cell> {
        Ok(Cell {
            orientation: slice.orientation,
            aspect: slice.aspect,
            pixels: CellPixels::Gray {
                data: extractor::pad_to_size(slice.data.view(), (canvas, canvas))?,
                window,
            },
        })
    };
    let [first, second, third] = slices;
    Ok([pad(first)?, pad(second)?, pad(third)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, s};

    fn blob(shape: (usize, usize, usize), value: f32) -> Volume {
        let mut data = Array3::<f32>::zeros(shape);
        data.slice_mut(s![2..6, 3..5, 1..8]).fill(value);
        Volume::new(data, (1.0, 1.0, 1.0))
    }

    #[test]
    fn row_defaults() {
        let row = Row::new("dmri_adc");
        assert_eq!(row.vmax(), None);
        assert_eq!(row.vmax_percentile(), 98.0);
        assert_eq!(row.padding(), 1);
    }

    #[test]
    fn row_rejects_invalid_options() {
        assert!(Row::new("fa").with_vmax(0.0).is_err());
        assert!(Row::new("fa").with_vmax(f32::NAN).is_err());
        assert!(Row::new("fa").with_vmax_percentile(101.0).is_err());
        assert!(Row::new("fa").with_vmax_percentile(-1.0).is_err());
    }

    #[test]
    fn row_deserialises_with_defaults_and_validation() {
        let row: Row = serde_json::from_str(r#"{"name": "dmri_fa", "vmax": 1.0}"#).unwrap();
        assert_eq!(row, Row::new("dmri_fa").with_vmax(1.0).unwrap());

        let row: Row =
            serde_json::from_str(r#"{"name": "t2star_qsm", "vmax_percentile": 95, "padding": 3}"#)
                .unwrap();
        assert_eq!(row.vmax_percentile(), 95.0);
        assert_eq!(row.padding(), 3);

        assert!(serde_json::from_str::<Row>(r#"{"name": "fa", "vmax": -2}"#).is_err());
    }

    #[test]
    fn window_uses_percentile_of_cropped_volume() {
        let volume = blob((20, 20, 20), 4.0);
        let cropped = volume.crop(0).unwrap();
        let window = Row::new("x").window(&cropped);
        assert_eq!(window, IntensityWindow { vmin: 0.0, vmax: 4.0 });
        // The uncropped volume is mostly zero, so its 98th percentile is not
        assert_eq!(volume.percentile(98.0), 0.0);
    }

    #[test]
    fn window_maps_linearly_and_saturates() {
        let window = IntensityWindow { vmin: 0.0, vmax: 2.0 };
        assert_eq!(window.to_u8(-1.0), 0);
        assert_eq!(window.to_u8(1.0), 127);
        assert_eq!(window.to_u8(2.0), 255);
        assert_eq!(window.to_u8(9.0), 255);
        let flat = IntensityWindow { vmin: 0.0, vmax: 0.0 };
        assert_eq!(flat.to_u8(0.0), 0);
        assert_eq!(flat.to_u8(0.5), 255);
    }

    #[test]
    fn compose_row_pads_to_one_square_canvas() {
        let cells = compose_row(&Row::new("x"), blob((10, 10, 10), 1.0), [0, 0, 0]).unwrap();
        // cropped with border 1: (6, 4, 9)
        for (cell, orientation) in cells.iter().zip(Orientation::COLUMNS) {
            assert_eq!(cell.orientation, orientation);
            assert_eq!(cell.dim(), (9, 9));
        }
    }

    #[test]
    fn compose_row_rejects_overflowing_offset() {
        let result = compose_row(&Row::new("x"), blob((10, 10, 10), 1.0), [isize::MAX, 0, 0]);
        assert!(matches!(result, Err(FigureError::SliceOutOfBounds { axis: 0, .. })));
    }

    #[test]
    fn compose_row_of_empty_volume_fails() {
        let volume = Volume::new(Array3::zeros((4, 4, 4)), (1.0, 1.0, 1.0));
        assert!(matches!(
            compose_row(&Row::new("x"), volume, [0, 0, 0]),
            Err(FigureError::EmptyVolume)
        ));
    }

    #[test]
    fn render_tiles_cells_without_spacing() {
        let cells = compose_row(&Row::new("x"), blob((10, 10, 10), 1.0), [0, 0, 0]).unwrap();
        let figure = Figure::new(vec![cells.clone(), cells]);
        let image = figure.render(NonZeroU32::new(32).unwrap(), Interpolation::None);
        assert_eq!(image.dimensions(), (96, 64));
        // canvas centres hold the blob at full intensity
        assert_eq!(image.get_pixel(16, 16), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(48, 48), &Rgb([255, 255, 255]));
        // corners are padding
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn render_letterboxes_anisotropic_cells() {
        let cell = Cell {
            orientation: Orientation::Coronal,
            aspect: 0.5,
            pixels: CellPixels::Gray {
                data: Array2::ones((4, 4)),
                window: IntensityWindow { vmin: 0.0, vmax: 1.0 },
            },
        };
        let figure = Figure::new(vec![[cell.clone(), cell.clone(), cell]]);
        let image = figure.render(NonZeroU32::new(40).unwrap(), Interpolation::Bilinear);
        // drawn 40 tall and 20 wide, centred
        assert_eq!(image.get_pixel(5, 20), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(20, 20), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(35, 20), &Rgb([0, 0, 0]));
    }
}
