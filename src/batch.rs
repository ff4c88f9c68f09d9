use std::num::NonZeroU32;
use std::path::PathBuf;

use tracing::{error, info, info_span};

use crate::config::{FigureDefinition, FigureKind};
use crate::enums::Interpolation;
use crate::error::{FigureError, Result};
use crate::output::{OutputRouter, Session};
use crate::panel::{self, Figure};
use crate::repository::VolumeAccessor;
use crate::viewer::MrviewBridge;

/// Outcome of one figure over every session.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<PathBuf>,
    pub shown: usize,
    pub failures: Vec<FigureError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Produces figures session by session, one at a time.
pub struct FigureRunner<'a> {
    accessor: &'a dyn VolumeAccessor,
    router: &'a OutputRouter,
    bridge: &'a MrviewBridge,
    cell_size: NonZeroU32,
    interpolation: Interpolation,
}

impl<'a> FigureRunner<'a> {
    pub fn new(
        accessor: &'a dyn VolumeAccessor,
        router: &'a OutputRouter,
        bridge: &'a MrviewBridge,
        cell_size: NonZeroU32,
        interpolation: Interpolation,
    ) -> Self {
        Self {
            accessor,
            router,
            bridge,
            cell_size,
            interpolation,
        }
    }

    /// Produce `definition` for every subject and visit. A failed session
    /// is logged and recorded, and the batch moves on to the next one.
    ///
    /// # Errors
    ///
    /// Only when the sessions themselves cannot be listed
    pub fn run(&self, definition: &FigureDefinition) -> Result<BatchReport> {
        let subject_ids = self.accessor.subject_ids()?;
        let visit_ids = self.accessor.visit_ids()?;
        let mut report = BatchReport::default();

        for subject_id in &subject_ids {
            for visit_id in &visit_ids {
                let _span = info_span!(
                    "figure",
                    name = %definition.name,
                    subject_id = %subject_id,
                    visit_id = %visit_id
                )
                .entered();
                let session = Session {
                    subject_id,
                    visit_id,
                    subject_count: subject_ids.len(),
                    visit_count: visit_ids.len(),
                };
                let outcome = self
                    .produce(definition, subject_id, visit_id)
                    .map(|figure| figure.render(self.cell_size, self.interpolation))
                    .and_then(|bitmap| self.router.save_or_show(&bitmap, &session));
                match outcome {
                    Ok(Some(path)) => report.saved.push(path),
                    Ok(None) => report.shown += 1,
                    Err(failure) => {
                        let failure = failure.in_figure(&definition.name, subject_id, visit_id);
                        error!("{failure}");
                        report.failures.push(failure);
                    }
                }
            }
        }

        info!(
            figure = %definition.name,
            saved = report.saved.len(),
            shown = report.shown,
            failed = report.failures.len(),
            "finished figure"
        );
        Ok(report)
    }

    /// Build one session's figure without rendering or routing it.
    pub fn produce(
        &self,
        definition: &FigureDefinition,
        subject_id: &str,
        visit_id: &str,
    ) -> Result<Figure> {
        match &definition.kind {
            FigureKind::Panel { rows, offset } => {
                panel::build_panel(rows, self.accessor, subject_id, visit_id, *offset)
            }
            FigureKind::Tracks { tracks, background } => {
                let tracks_path = self.accessor.get_path(tracks, subject_id, visit_id)?;
                let background_path = self.accessor.get_path(background, subject_id, visit_id)?;
                self.bridge.render_tracks(&tracks_path, &background_path)
            }
        }
    }
}
