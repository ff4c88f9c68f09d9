//! # volume-figures
//!
//! This crate composes manuscript figures from 3-D MRI volumes.
//!
//! Each derivative image of a session (FA, ADC, QSM, ...) becomes one row of
//! a panel holding its three orthogonal mid-plane slices:
//!  - Sagittal
//!  - Coronal
//!  - Axial
//!
//! Volumes are cropped to their nonzero content before slicing, so that the
//! three slices of a row can be padded onto one square canvas and line up.
//! Every row gets its own intensity window, from zero up to either a fixed
//! value or a percentile of the cropped intensities.
//!
//! Tractography streamlines are rendered by MRtrix's `mrview`, driven as a
//! subprocess once per camera plane, and its screenshots are cropped and
//! padded the same way to give a one-row figure.
//!
//! Volumes are read through the [`VolumeAccessor`] trait. The
//! [`DirectoryRepository`] implementation reads NIfTI files and DICOM series
//! laid out as `<root>/<subject>/<visit>/<derivative>`.
//!
//! # Slice convention
//!
//! Volume axes are (x, y, z) in stored voxel order. A plane spanning axes
//! (a, b), a < b, is displayed with b along the rows, highest index on top,
//! and a along the columns, lowest index on the left. No left-right flip is
//! applied. Each slice is drawn with pixels `spacing[a] / spacing[b]` times
//! as wide as they are tall.
//!
//! # Examples
//!
//! ## Saving an FA/ADC panel for every session
//!
//! ```no_run
//! # use std::num::NonZeroU32;
//! # use volume_figures::{
//! #     DirectoryRepository, FigureRunner, Interpolation, MrviewBridge, OutputRouter,
//! #     OutputTarget, ViewerConfig, config::{FigureDefinition, FigureKind}, Row,
//! # };
//! let repository = DirectoryRepository::open("data").expect("should open repository");
//! let router = OutputRouter::new(OutputTarget::File("figures/fa_adc.png".into()));
//! let bridge = MrviewBridge::new(ViewerConfig::default()).expect("should accept defaults");
//! let figure = FigureDefinition {
//!     name: "fa_adc".to_string(),
//!     kind: FigureKind::Panel {
//!         rows: vec![
//!             Row::new("dmri_fa").with_vmax(1.0).expect("should accept vmax"),
//!             Row::new("dmri_adc"),
//!         ],
//!         offset: [6, 0, 0],
//!     },
//! };
//! let cell_size = NonZeroU32::new(256).expect("should be nonzero");
//! let runner = FigureRunner::new(&repository, &router, &bridge, cell_size, Interpolation::Bilinear);
//! let report = runner.run(&figure).expect("should list sessions");
//! assert!(report.is_success());
//! ```

pub mod batch;
pub mod config;
pub mod enums;
pub mod error;
pub mod extractor;
mod interpolator;
pub mod output;
pub mod panel;
pub mod repository;
pub mod viewer;
pub mod volume;
pub mod volume_loader;

pub use batch::{BatchReport, FigureRunner};
pub use config::Config;
pub use enums::{Interpolation, Orientation, SortBy};
pub use error::{FigureError, Result};
pub use extractor::{Slice, crop, mid_slices, pad_to_size};
pub use output::{OutputRouter, OutputTarget, Session};
pub use panel::{Cell, CellPixels, Figure, IntensityWindow, Row, build_panel};
pub use repository::{DirectoryRepository, VolumeAccessor};
pub use viewer::{MrviewBridge, ViewerConfig};
pub use volume::{Volume, VolumeId};
