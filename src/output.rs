//! Showing or saving rendered figures.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::{ImageFormat, RgbImage};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{FigureError, Result};

pub const DEFAULT_IMAGE_VIEWER: &str = "xdg-open";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// Open each figure in an image viewer and keep nothing
    Display,
    /// Path template, suffixed per subject and visit when needed
    File(PathBuf),
}

/// Where in the batch a figure belongs.
#[derive(Clone, Copy, Debug)]
pub struct Session<'a> {
    pub subject_id: &'a str,
    pub visit_id: &'a str,
    pub subject_count: usize,
    pub visit_count: usize,
}

/// `{base}[-sub{subject_id}][-vis{visit_id}]{ext}`, with each suffix only
/// when the batch spans more than one subject or visit.
pub fn session_path(template: &Path, session: &Session<'_>) -> PathBuf {
    let mut file_name = template
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    if session.subject_count > 1 {
        file_name.push(format!("-sub{}", session.subject_id));
    }
    if session.visit_count > 1 {
        file_name.push(format!("-vis{}", session.visit_id));
    }
    if let Some(extension) = template.extension() {
        file_name.push(".");
        file_name.push(extension);
    }
    template.with_file_name(file_name)
}

#[derive(Clone, Debug)]
pub struct OutputRouter {
    target: OutputTarget,
    image_viewer: String,
}

impl OutputRouter {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            image_viewer: DEFAULT_IMAGE_VIEWER.to_string(),
        }
    }

    /// Command used for [`OutputTarget::Display`]; it receives the image
    /// path as its only argument.
    pub fn with_image_viewer(mut self, command: impl Into<String>) -> Self {
        self.image_viewer = command.into();
        self
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Show `bitmap`, blocking until the viewer command exits, or write it
    /// to the session's path. Returns the written path.
    ///
    /// Shown figures are left in the temporary directory after a successful
    /// viewer run, since launchers like `xdg-open` return before the viewer
    /// they start has read the file.
    ///
    /// The file is written beside its destination and renamed into place,
    /// so a failed write never leaves a partial file behind.
    pub fn save_or_show(&self, bitmap: &RgbImage, session: &Session<'_>) -> Result<Option<PathBuf>> {
        match &self.target {
            OutputTarget::Display => {
                self.show(bitmap)?;
                Ok(None)
            }
            OutputTarget::File(template) => {
                let path = session_path(template, session);
                write_atomically(bitmap, &path)?;
                info!(path = %path.display(), "saved figure");
                Ok(Some(path))
            }
        }
    }

    fn show(&self, bitmap: &RgbImage) -> Result<()> {
        let viewer = which::which(&self.image_viewer).map_err(|_| FigureError::ToolNotAvailable {
            tool: self.image_viewer.clone(),
        })?;
        let file = tempfile::Builder::new()
            .prefix("figure-")
            .suffix(".png")
            .tempfile()?;
        bitmap.save_with_format(file.path(), ImageFormat::Png)?;
        let path = file.into_temp_path().keep().map_err(|error| error.error)?;

        let outcome = Command::new(&viewer)
            .arg(&path)
            .stdin(Stdio::null())
            .status()
            .map_err(|error| format!("could not start: {error}"))
            .and_then(|status| {
                if status.success() {
                    Ok(())
                } else {
                    Err(format!("exited with {status}"))
                }
            });
        match outcome {
            Ok(()) => {
                info!(path = %path.display(), "figure handed to image viewer");
                Ok(())
            }
            Err(reason) => {
                if let Err(error) = fs::remove_file(&path) {
                    warn!(path = %path.display(), %error, "could not remove figure");
                }
                Err(FigureError::ExternalTool {
                    command: self.image_viewer.clone(),
                    reason,
                })
            }
        }
    }
}

fn write_atomically(bitmap: &RgbImage, path: &Path) -> Result<()> {
    let write_error = |reason: String| FigureError::OutputWrite {
        path: path.to_path_buf(),
        reason,
    };
    let format = ImageFormat::from_path(path).map_err(|error| write_error(error.to_string()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let file = NamedTempFile::new_in(directory).map_err(|error| write_error(error.to_string()))?;
    let mut writer = BufWriter::new(file);
    bitmap
        .write_to(&mut writer, format)
        .map_err(|error| write_error(error.to_string()))?;
    writer.flush().map_err(|error| write_error(error.to_string()))?;
    let file = writer
        .into_inner()
        .map_err(|error| write_error(error.to_string()))?;
    file.persist(path)
        .map_err(|error| write_error(error.error.to_string()))?;
    Ok(())
}
