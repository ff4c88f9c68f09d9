//! Access to derivative volumes by (name, subject, visit).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::enums::SortBy;
use crate::error::{FigureError, Result};
use crate::volume::Volume;
use crate::volume_loader::VolumeLoader;

/// Source of the volumes figures are built from.
pub trait VolumeAccessor {
    fn get(&self, name: &str, subject_id: &str, visit_id: &str) -> Result<Volume>;

    /// Location on disk, for tools that read the data themselves.
    fn get_path(&self, name: &str, subject_id: &str, visit_id: &str) -> Result<PathBuf>;

    fn subject_ids(&self) -> Result<Vec<String>>;

    fn visit_ids(&self) -> Result<Vec<String>>;
}

/// Derivatives stored as `<root>/<subject>/<visit>/<name>[.ext]`, where the
/// entry is a NIfTI file, a DICOM series directory, or any other file
/// handed to external tools by path (e.g. `.tck` streamlines).
#[derive(Clone, Debug)]
pub struct DirectoryRepository {
    root: PathBuf,
    sort_by: SortBy,
}

impl DirectoryRepository {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FigureError::config(format!(
                "repository root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            sort_by: SortBy::default(),
        })
    }

    /// Slice order used when a derivative is a DICOM series.
    #[must_use]
    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, subject_id: &str, visit_id: &str) -> PathBuf {
        self.root.join(subject_id).join(visit_id)
    }

    fn missing(name: &str, subject_id: &str, visit_id: &str) -> FigureError {
        FigureError::MissingDerivative {
            name: name.to_string(),
            subject_id: subject_id.to_string(),
            visit_id: visit_id.to_string(),
        }
    }
}

impl VolumeAccessor for DirectoryRepository {
    fn get(&self, name: &str, subject_id: &str, visit_id: &str) -> Result<Volume> {
        let path = self.get_path(name, subject_id, visit_id)?;
        debug!(path = %path.display(), "loading volume");
        VolumeLoader::load(path, self.sort_by)
    }

    fn get_path(&self, name: &str, subject_id: &str, visit_id: &str) -> Result<PathBuf> {
        let session = self.session_dir(subject_id, visit_id);
        let entries = match fs::read_dir(&session) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(Self::missing(name, subject_id, visit_id));
            }
            Err(error) => return Err(error.into()),
        };
        let mut matches: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| derivative_name(path) == Some(name))
            .collect();
        // Several entries may share a name
        matches.sort();
        matches
            .into_iter()
            .next()
            .ok_or_else(|| Self::missing(name, subject_id, visit_id))
    }

    fn subject_ids(&self) -> Result<Vec<String>> {
        child_dirs(&self.root)
    }

    fn visit_ids(&self) -> Result<Vec<String>> {
        let mut visits = BTreeSet::new();
        for subject in child_dirs(&self.root)? {
            visits.extend(child_dirs(&self.root.join(subject))?);
        }
        Ok(visits.into_iter().collect())
    }
}

/// File name up to its first `.`, so `dmri_fa.nii.gz` names `dmri_fa`.
fn derivative_name(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    file_name.split('.').next().filter(|name| !name.is_empty())
}

fn child_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}
