use std::fmt;

use ndarray::Array3;

use crate::error::Result;
use crate::extractor;

/// Names one derivative image of one session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VolumeId {
    pub name: String,
    pub subject_id: String,
    pub visit_id: String,
}

impl VolumeId {
    pub fn new(
        name: impl Into<String>,
        subject_id: impl Into<String>,
        visit_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subject_id: subject_id.into(),
            visit_id: visit_id.into(),
        }
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.subject_id, self.visit_id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Volume {
    pub data: Array3<f32>,
    pub spacing: (f32, f32, f32),
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: (f32, f32, f32)) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (x, y, z)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Voxel spacing along `axis`
    pub fn spacing_along(&self, axis: usize) -> f32 {
        match axis {
            0 => self.spacing.0,
            1 => self.spacing.1,
            _ => self.spacing.2,
        }
    }

    /// Replace NaN voxels with zero.
    pub fn zero_nan(&mut self) {
        self.data.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
    }

    /// Crop to the bounding box of the nonzero voxels, grown by `border`
    /// voxels per side. Spacing is unchanged.
    pub fn crop(&self, border: usize) -> Result<Volume> {
        Ok(Volume {
            data: extractor::crop(self.data.view(), border)?,
            spacing: self.spacing,
        })
    }

    /// Intensity at the given percentile (0-100), linearly interpolated
    /// between the two closest ranks.
    pub fn percentile(&self, percentile: f32) -> f32 {
        let mut values: Vec<f32> = self.data.iter().copied().collect();
        if values.is_empty() {
            return 0.0;
        }
        values.sort_unstable_by(f32::total_cmp);
        let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f32;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let fraction = rank - lower as f32;
        values[lower].mul_add(1.0 - fraction, values[upper] * fraction)
    }
}
