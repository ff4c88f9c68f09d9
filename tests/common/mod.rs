#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use ndarray::{Array3, s};
use volume_figures::{FigureError, Result, Volume, VolumeAccessor, VolumeId};

/// Volumes and paths held in memory, keyed by (name, subject, visit).
#[derive(Default)]
pub struct MemoryRepository {
    pub subjects: Vec<String>,
    pub visits: Vec<String>,
    pub volumes: HashMap<VolumeId, Volume>,
    pub paths: HashMap<VolumeId, PathBuf>,
}

impl MemoryRepository {
    pub fn new(subjects: &[&str], visits: &[&str]) -> Self {
        Self {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            visits: visits.iter().map(|v| v.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, name: &str, subject_id: &str, visit_id: &str, volume: Volume) {
        self.volumes
            .insert(VolumeId::new(name, subject_id, visit_id), volume);
    }

    pub fn insert_path(&mut self, name: &str, subject_id: &str, visit_id: &str, path: PathBuf) {
        self.paths.insert(VolumeId::new(name, subject_id, visit_id), path);
    }

    fn missing(name: &str, subject_id: &str, visit_id: &str) -> FigureError {
        FigureError::MissingDerivative {
            name: name.to_string(),
            subject_id: subject_id.to_string(),
            visit_id: visit_id.to_string(),
        }
    }
}

impl VolumeAccessor for MemoryRepository {
    fn get(&self, name: &str, subject_id: &str, visit_id: &str) -> Result<Volume> {
        self.volumes
            .get(&VolumeId::new(name, subject_id, visit_id))
            .cloned()
            .ok_or_else(|| Self::missing(name, subject_id, visit_id))
    }

    fn get_path(&self, name: &str, subject_id: &str, visit_id: &str) -> Result<PathBuf> {
        self.paths
            .get(&VolumeId::new(name, subject_id, visit_id))
            .cloned()
            .ok_or_else(|| Self::missing(name, subject_id, visit_id))
    }

    fn subject_ids(&self) -> Result<Vec<String>> {
        Ok(self.subjects.clone())
    }

    fn visit_ids(&self) -> Result<Vec<String>> {
        Ok(self.visits.clone())
    }
}

/// A 32³ volume with an off-centre ellipsoid-ish block of `value`, plus a
/// brighter core so percentiles differ from the maximum.
pub fn synthetic_volume(value: f32, spacing: (f32, f32, f32)) -> Volume {
    let mut data = Array3::<f32>::zeros((32, 32, 32));
    data.slice_mut(s![6..24, 8..26, 4..20]).fill(value);
    data.slice_mut(s![12..16, 14..18, 10..14]).fill(value * 4.0);
    Volume::new(data, spacing)
}
