//! Declarative figure definitions.
//!
//! A JSON file lists the figures to produce; without one the manuscript
//! figures from [`Config::manuscript`] are used.

use std::collections::HashSet;
use std::fs;
use std::num::NonZeroU32;
use std::path::Path;

use serde::Deserialize;

use crate::enums::{Interpolation, SortBy};
use crate::error::{FigureError, Result};
use crate::panel::Row;
use crate::viewer::ViewerConfig;

pub const DEFAULT_CELL_SIZE: u32 = 256;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Side in pixels of one rendered cell
    #[serde(default = "default_cell_size")]
    pub cell_size: NonZeroU32,
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Stacking order of DICOM series derivatives
    #[serde(default)]
    pub dicom_sort: SortBy,
    #[serde(default)]
    pub viewer: ViewerConfig,
    pub figures: Vec<FigureDefinition>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FigureDefinition {
    /// Also the output file stem
    pub name: String,
    #[serde(flatten)]
    pub kind: FigureKind,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FigureKind {
    /// One row per derivative, three orthogonal slices each
    Panel {
        rows: Vec<Row>,
        /// Shift of the slice index along each axis from the middle
        #[serde(default)]
        offset: [isize; 3],
    },
    /// Streamlines drawn over a background volume by the external viewer
    Tracks { tracks: String, background: String },
}

fn default_cell_size() -> NonZeroU32 {
    NonZeroU32::new(DEFAULT_CELL_SIZE).unwrap_or(NonZeroU32::MIN)
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The figures of the Arcana manuscript: vein imaging, diffusion
    /// scalar maps, and whole-brain tractography.
    pub fn manuscript() -> Result<Self> {
        // Move the sagittal plane off the midline into a hemisphere
        let dmri_offset = [6, 0, 0];
        let config = Config {
            cell_size: default_cell_size(),
            interpolation: Interpolation::default(),
            dicom_sort: SortBy::default(),
            viewer: ViewerConfig::default(),
            figures: vec![
                FigureDefinition {
                    name: "veins".to_string(),
                    kind: FigureKind::Panel {
                        rows: vec![
                            Row::new("swi_brain"),
                            Row::new("t2star_qsm").with_vmax_percentile(95.0)?,
                            Row::new("t2star_composite_vein_image"),
                            Row::new("t2star_vein_mask"),
                        ],
                        offset: [0, 0, 0],
                    },
                },
                FigureDefinition {
                    name: "fa_adc".to_string(),
                    kind: FigureKind::Panel {
                        rows: vec![Row::new("dmri_fa").with_vmax(1.0)?, Row::new("dmri_adc")],
                        offset: dmri_offset,
                    },
                },
                FigureDefinition {
                    name: "tractography".to_string(),
                    kind: FigureKind::Tracks {
                        tracks: "dmri_global_tracks".to_string(),
                        background: "dmri_fa".to_string(),
                    },
                },
            ],
        };
        config.validate()?;
        Ok(config)
    }

    pub fn figure(&self, name: &str) -> Option<&FigureDefinition> {
        self.figures.iter().find(|figure| figure.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for figure in &self.figures {
            if !names.insert(figure.name.as_str()) {
                return Err(FigureError::config(format!(
                    "figure `{}` is defined twice",
                    figure.name
                )));
            }
            if let FigureKind::Panel { rows, .. } = &figure.kind
                && rows.is_empty()
            {
                return Err(FigureError::config(format!(
                    "panel `{}` has no rows",
                    figure.name
                )));
            }
        }
        Ok(())
    }
}
