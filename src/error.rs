use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FigureError>;

#[derive(Debug, Error)]
pub enum FigureError {
    #[error("volume contains no nonzero voxels")]
    EmptyVolume,

    #[error("cannot pad {current:?} to smaller size {target:?}")]
    PaddingSize {
        current: (usize, usize),
        target: (usize, usize),
    },

    #[error("slice index {index} is outside axis {axis} of length {len}")]
    SliceOutOfBounds { axis: usize, index: isize, len: usize },

    #[error("invalid row `{name}`: {message}")]
    InvalidRow { name: String, message: String },

    #[error("external tool not available: {tool}")]
    ToolNotAvailable { tool: String },

    #[error("external tool failed: {command} ({reason})")]
    ExternalTool { command: String, reason: String },

    #[error("could not write figure to {path}: {reason}")]
    OutputWrite { path: PathBuf, reason: String },

    #[error("no `{name}` found for subject {subject_id}, visit {visit_id}")]
    MissingDerivative {
        name: String,
        subject_id: String,
        visit_id: String,
    },

    #[error("no valid DICOM images found in {path}")]
    NoValidImages { path: PathBuf },

    #[error("inconsistent DICOM image dimensions in {path}")]
    InconsistentDimensions { path: PathBuf },

    #[error("no DICOM image in {path} carries pixel spacing and slice thickness")]
    MissingSpacing { path: PathBuf },

    #[error("expected a 3-D volume in {path}, found {ndim} dimensions")]
    NotVolumetric { path: PathBuf, ndim: usize },

    #[error("unsupported volume format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("row `{derivative}`: {source}")]
    Row {
        derivative: String,
        #[source]
        source: Box<FigureError>,
    },

    #[error("figure `{figure}` (subject {subject_id}, visit {visit_id}): {source}")]
    Figure {
        figure: String,
        subject_id: String,
        visit_id: String,
        #[source]
        source: Box<FigureError>,
    },
}

impl FigureError {
    #[must_use]
    pub fn in_row(self, derivative: impl Into<String>) -> Self {
        Self::Row {
            derivative: derivative.into(),
            source: Box::new(self),
        }
    }

    #[must_use]
    pub fn in_figure(
        self,
        figure: impl Into<String>,
        subject_id: impl Into<String>,
        visit_id: impl Into<String>,
    ) -> Self {
        Self::Figure {
            figure: figure.into(),
            subject_id: subject_id.into(),
            visit_id: visit_id.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with row and figure context stripped.
    pub fn root(&self) -> &FigureError {
        match self {
            Self::Row { source, .. } | Self::Figure { source, .. } => source.root(),
            other => other,
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
