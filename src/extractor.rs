//! Cropping, padding and mid-plane extraction.
//!
//! Slices are laid out with the second spanned axis as rows, highest index
//! at the top, and the first spanned axis as columns in increasing order.
//! No left-right flip is applied. See [`Orientation`] for which axes each
//! plane spans.

use std::ops::Range;

use ndarray::{Array, Array2, Array3, ArrayView, ArrayView3, Axis, Dimension, RemoveAxis, s};

use crate::enums::Orientation;
use crate::error::{FigureError, Result};
use crate::volume::Volume;

/// A plane cut from a volume, ready to be padded and drawn.
#[derive(Clone, Debug)]
pub struct Slice {
    pub orientation: Orientation,
    pub data: Array2<f32>,
    /// Physical width of one pixel over its height: the spacing of the
    /// column axis divided by the spacing of the row axis.
    pub aspect: f32,
}

impl Slice {
    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Crop `array` to the inclusive bounding box of its nonzero elements,
/// grown by `border` elements on each side and clipped to the array.
pub fn crop<A, D>(array: ArrayView<'_, A, D>, border: usize) -> Result<Array<A, D>>
where
    A: Clone + Default + PartialEq,
    D: RemoveAxis,
{
    let zero = A::default();
    let ranges = (0..array.ndim())
        .map(|axis| occupied_range(&array, Axis(axis), |v| *v != zero))
        .collect::<Option<Vec<_>>>()
        .ok_or(FigureError::EmptyVolume)?;
    Ok(slice_ranges(&array, &grow(ranges, border, array.shape())))
}

/// Crop an (height, width, channels) capture on its two spatial axes. A
/// pixel is occupied when any of its channels is nonzero.
pub fn crop_capture(capture: ArrayView3<'_, u8>, border: usize) -> Result<Array3<u8>> {
    let ranges = [Axis(0), Axis(1)]
        .into_iter()
        .map(|axis| occupied_range(&capture, axis, |v| *v != 0))
        .collect::<Option<Vec<_>>>()
        .ok_or(FigureError::EmptyVolume)?;
    Ok(slice_ranges(&capture, &grow(ranges, border, capture.shape())))
}

/// Zero-pad the two leading axes of `array` to exactly `target`, keeping
/// the content centred. Any trailing axes are left as they are.
pub fn pad_to_size<A, D>(array: ArrayView<'_, A, D>, target: (usize, usize)) -> Result<Array<A, D>>
where
    A: Clone + Default,
    D: Dimension,
{
    debug_assert!(array.ndim() >= 2, "padding needs at least two axes");
    let current = (array.shape()[0], array.shape()[1]);
    if target.0 < current.0 || target.1 < current.1 {
        return Err(FigureError::PaddingSize { current, target });
    }
    let before = pad_before(current, target);

    let mut shape = array.raw_dim();
    shape[0] = target.0;
    shape[1] = target.1;
    let mut padded = Array::from_elem(shape, A::default());
    padded
        .slice_each_axis_mut(|desc| match desc.axis.index() {
            0 => ndarray::Slice::from(before.0..before.0 + current.0),
            1 => ndarray::Slice::from(before.1..before.1 + current.1),
            _ => ndarray::Slice::from(..),
        })
        .assign(&array);
    Ok(padded)
}

/// Leading padding `pad_to_size` applies on each axis.
pub fn pad_before(current: (usize, usize), target: (usize, usize)) -> (usize, usize) {
    (
        target.0.saturating_sub(current.0) / 2,
        target.1.saturating_sub(current.1) / 2,
    )
}

/// Side of the smallest square canvas that holds every given (rows, cols).
pub fn square_canvas(dims: impl IntoIterator<Item = (usize, usize)>) -> usize {
    dims.into_iter()
        .map(|(rows, cols)| rows.max(cols))
        .max()
        .unwrap_or(0)
}

/// The three planes through the middle voxel, in column order.
pub fn mid_slices(volume: &Volume) -> [Slice; 3] {
    Orientation::COLUMNS.map(|orientation| {
        let len = volume.data.len_of(Axis(orientation.fixed_axis()));
        extract_plane(volume, orientation, len / 2)
    })
}

/// Like [`mid_slices`] with the index along each fixed axis shifted by
/// `offset[axis]`.
pub fn offset_slices(volume: &Volume, offset: [isize; 3]) -> Result<[Slice; 3]> {
    let mut indices = [0usize; 3];
    for (axis, index) in indices.iter_mut().enumerate() {
        let len = volume.data.len_of(Axis(axis));
        let out_of_bounds = |index: isize| FigureError::SliceOutOfBounds { axis, index, len };
        let shifted = isize::try_from(len / 2)
            .ok()
            .and_then(|middle| middle.checked_add(offset[axis]))
            .ok_or_else(|| out_of_bounds(offset[axis]))?;
        *index = usize::try_from(shifted)
            .ok()
            .filter(|&index| index < len)
            .ok_or_else(|| out_of_bounds(shifted))?;
    }
    Ok(Orientation::COLUMNS
        .map(|orientation| extract_plane(volume, orientation, indices[orientation.fixed_axis()])))
}

fn extract_plane(volume: &Volume, orientation: Orientation, index: usize) -> Slice {
    let (column_axis, row_axis) = orientation.spanned_axes();
    let plane = volume.data.index_axis(Axis(orientation.fixed_axis()), index);
    Slice {
        orientation,
        data: plane.t().slice(s![..;-1, ..]).to_owned(),
        aspect: volume.spacing_along(column_axis) / volume.spacing_along(row_axis),
    }
}

fn occupied_range<A, D, F>(array: &ArrayView<'_, A, D>, axis: Axis, occupied: F) -> Option<(usize, usize)>
where
    D: RemoveAxis,
    F: Fn(&A) -> bool,
{
    let mut indices = array
        .axis_iter(axis)
        .enumerate()
        .filter(|(_, lane)| lane.iter().any(&occupied))
        .map(|(index, _)| index);
    let first = indices.next()?;
    Some((first, indices.last().unwrap_or(first)))
}

fn grow(ranges: Vec<(usize, usize)>, border: usize, shape: &[usize]) -> Vec<Range<usize>> {
    ranges
        .into_iter()
        .zip(shape)
        .map(|((first, last), &len)| first.saturating_sub(border)..(last + border + 1).min(len))
        .collect()
}

fn slice_ranges<A, D>(array: &ArrayView<'_, A, D>, ranges: &[Range<usize>]) -> Array<A, D>
where
    A: Clone,
    D: Dimension,
{
    array
        .slice_each_axis(|desc| {
            ranges
                .get(desc.axis.index())
                .cloned()
                .map_or(ndarray::Slice::from(..), ndarray::Slice::from)
        })
        .to_owned()
}
