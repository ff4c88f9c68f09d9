//! Rendering tractography through MRtrix's `mrview`.
//!
//! `-capture.grab` writes `screenshot0000.png` into the working directory
//! of `mrview`. Each capture runs in its own fresh temporary directory,
//! removed when the capture returns, successful or not.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use ndarray::Array3;
use serde::Deserialize;
use tempfile::TempDir;
use tracing::debug;

use crate::enums::Orientation;
use crate::error::{FigureError, Result};
use crate::extractor;
use crate::panel::{Cell, CellPixels, Figure};

/// File `mrview -capture.grab` writes into its working directory.
pub const SCREENSHOT_FILE: &str = "screenshot0000.png";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Executable name or path
    pub executable: PathBuf,
    /// Window size in pixels, (width, height)
    pub view_size: (u32, u32),
    /// Border kept around the cropped captures
    pub padding: usize,
    /// `-plane` value for each figure column
    pub camera_planes: [u8; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("mrview"),
            view_size: (100, 100),
            padding: 1,
            camera_planes: Orientation::COLUMNS.map(Orientation::camera_plane),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MrviewBridge {
    config: ViewerConfig,
}

impl MrviewBridge {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        if config.camera_planes.iter().any(|&plane| plane > 2) {
            return Err(FigureError::config(format!(
                "camera planes must be 0, 1 or 2, got {:?}",
                config.camera_planes
            )));
        }
        if config.view_size.0 == 0 || config.view_size.1 == 0 {
            return Err(FigureError::config("viewer window size must be nonzero"));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Draw `tracks_path` over `background_path` from each camera plane and
    /// lay the captures out as a single figure row.
    pub fn render_tracks(&self, tracks_path: &Path, background_path: &Path) -> Result<Figure> {
        let executable = which::which(&self.config.executable).map_err(|_| {
            FigureError::ToolNotAvailable {
                tool: self.config.executable.display().to_string(),
            }
        })?;

        let mut captures = Vec::with_capacity(3);
        for plane in self.config.camera_planes {
            let capture = self.capture(&executable, tracks_path, background_path, plane)?;
            captures.push((plane, extractor::crop_capture(capture.view(), self.config.padding)?));
        }

        let canvas = extractor::square_canvas(
            captures
                .iter()
                .map(|(_, capture)| (capture.len_of(ndarray::Axis(0)), capture.len_of(ndarray::Axis(1)))),
        );
        let mut cells = Vec::with_capacity(3);
        for (plane, capture) in captures {
            cells.push(Cell {
                orientation: Orientation::from_camera_plane(plane).unwrap_or(Orientation::Axial),
                aspect: 1.0,
                pixels: CellPixels::Rgb(extractor::pad_to_size(capture.view(), (canvas, canvas))?),
            });
        }
        let row: [Cell; 3] = cells
            .try_into()
            .map_err(|_| FigureError::config("expected exactly three captures"))?;
        Ok(Figure::new(vec![row]))
    }

    /// The argument list for one capture, in the order `mrview` expects.
    pub fn arguments(&self, tracks_path: &Path, background_path: &Path, plane: u8) -> Vec<String> {
        let (width, height) = self.config.view_size;
        vec![
            background_path.display().to_string(),
            "-tractography.load".to_string(),
            tracks_path.display().to_string(),
            "-plane".to_string(),
            plane.to_string(),
            "-noannotations".to_string(),
            "-lock".to_string(),
            "yes".to_string(),
            "-size".to_string(),
            format!("{width},{height}"),
            "-capture.grab".to_string(),
            "-exit".to_string(),
        ]
    }

    fn capture(
        &self,
        executable: &Path,
        tracks_path: &Path,
        background_path: &Path,
        plane: u8,
    ) -> Result<Array3<u8>> {
        let workdir = tempfile::Builder::new().prefix("mrview-capture-").tempdir()?;
        debug!(plane, workdir = %workdir.path().display(), "capturing tracks");

        let command = executable.display().to_string();
        let output = Command::new(executable)
            .args(self.arguments(tracks_path, background_path, plane))
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|error| FigureError::ExternalTool {
                command: command.clone(),
                reason: format!("could not start: {error}"),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FigureError::ExternalTool {
                command,
                reason: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        read_screenshot(&workdir, &command)
    }
}

/// Load the screenshot as (height, width, rgb).
fn read_screenshot(workdir: &TempDir, command: &str) -> Result<Array3<u8>> {
    let path = workdir.path().join(SCREENSHOT_FILE);
    let image = image::open(&path)
        .map_err(|error| FigureError::ExternalTool {
            command: command.to_string(),
            reason: format!("unreadable screenshot {}: {error}", path.display()),
        })?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Ok(Array3::from_shape_vec(
        (height as usize, width as usize, 3),
        image.into_raw(),
    )?)
}
