#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use volume_figures::{CellPixels, FigureError, MrviewBridge, Orientation, ViewerConfig};

/// Write an executable shell script standing in for mrview.
fn fake_mrview(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("mrview");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// 40x30 black screenshot with a `width` x `height` coloured block at
/// (left, top).
fn screenshot(
    dir: &Path,
    name: &str,
    (left, top): (u32, u32),
    (width, height): (u32, u32),
) -> PathBuf {
    let mut image = RgbImage::new(40, 30);
    for y in top..top + height {
        for x in left..left + width {
            image.put_pixel(x, y, Rgb([200, 40, 90]));
        }
    }
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn bridge(executable: PathBuf) -> MrviewBridge {
    MrviewBridge::new(ViewerConfig {
        executable,
        view_size: (40, 30),
        ..ViewerConfig::default()
    })
    .unwrap()
}

fn logged_lines(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn captures_are_cropped_padded_and_laid_out() {
    let dir = tempfile::tempdir().unwrap();
    let shot = screenshot(dir.path(), "shot.png", (10, 5), (10, 20));
    let log = dir.path().join("calls.log");
    let executable = fake_mrview(
        dir.path(),
        &format!(
            "echo \"$(pwd) $*\" >> '{}'\ncp '{}' screenshot0000.png",
            log.display(),
            shot.display()
        ),
    );

    let figure = bridge(executable)
        .render_tracks(Path::new("/data/tracks.tck"), Path::new("/data/fa.nii.gz"))
        .unwrap();

    assert_eq!(figure.shape(), (1, 3));
    for (cell, orientation) in figure.rows()[0].iter().zip(Orientation::COLUMNS) {
        assert_eq!(cell.orientation, orientation);
        // 20x10 block plus one pixel each side, padded square
        assert_eq!(cell.dim(), (22, 22));
        match &cell.pixels {
            CellPixels::Rgb(pixels) => {
                assert_eq!(pixels[[11, 11, 0]], 200);
                assert_eq!(pixels[[0, 0, 0]], 0);
            }
            CellPixels::Gray { .. } => panic!("captures are colour"),
        }
    }

    let calls = logged_lines(&log);
    assert_eq!(calls.len(), 3);
    let mut workdirs = Vec::new();
    for (plane, call) in calls.iter().enumerate() {
        let (workdir, arguments) = call.split_once(' ').unwrap();
        assert_eq!(
            arguments,
            format!(
                "/data/fa.nii.gz -tractography.load /data/tracks.tck -plane {plane} \
                 -noannotations -lock yes -size 40,30 -capture.grab -exit"
            )
        );
        assert!(!Path::new(workdir).exists(), "{workdir} was not cleaned up");
        workdirs.push(workdir.to_string());
    }
    workdirs.dedup();
    assert_eq!(workdirs.len(), 3, "each capture needs its own directory");
}

#[test]
fn captures_share_one_canvas_sized_by_the_largest_crop() {
    let dir = tempfile::tempdir().unwrap();
    // cropped with a one pixel border: 22x12, 8x32 and 6x6
    screenshot(dir.path(), "plane0.png", (10, 5), (10, 20));
    screenshot(dir.path(), "plane1.png", (4, 12), (30, 6));
    screenshot(dir.path(), "plane2.png", (20, 20), (4, 4));
    // $5 is the -plane value
    let executable = fake_mrview(
        dir.path(),
        &format!("cp '{}'/plane$5.png screenshot0000.png", dir.path().display()),
    );

    let figure = bridge(executable)
        .render_tracks(Path::new("tracks.tck"), Path::new("fa.nii.gz"))
        .unwrap();

    let row = &figure.rows()[0];
    for cell in row {
        assert_eq!(cell.dim(), (32, 32));
    }
    let pixels = |column: usize| match &row[column].pixels {
        CellPixels::Rgb(pixels) => pixels.clone(),
        CellPixels::Gray { .. } => panic!("captures are colour"),
    };
    // the 6x6 axial crop starts 13 pixels in, its block one further
    let axial = pixels(2);
    assert_eq!(axial[[13, 13, 0]], 0);
    assert_eq!(axial[[14, 14, 0]], 200);
    assert_eq!(axial[[17, 17, 0]], 200);
    assert_eq!(axial[[18, 18, 0]], 0);
    // the 8x32 coronal crop fills the width
    let coronal = pixels(1);
    assert_eq!(coronal[[13, 1, 0]], 200);
    assert_eq!(coronal[[13, 30, 0]], 200);
    assert_eq!(coronal[[11, 16, 0]], 0);
}

#[test]
fn unstartable_executable_is_an_external_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mrview");
    fs::write(&path, "#!/nonexistent-interpreter-5e1a/sh\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    let error = bridge(path)
        .render_tracks(Path::new("tracks.tck"), Path::new("fa.nii.gz"))
        .unwrap_err();

    match error {
        FigureError::ExternalTool { command, reason } => {
            assert!(command.ends_with("mrview"));
            assert!(reason.starts_with("could not start"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn nonzero_exit_is_an_external_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let executable = fake_mrview(
        dir.path(),
        &format!("pwd >> '{}'\necho 'no OpenGL' >&2\nexit 3", log.display()),
    );

    let error = bridge(executable)
        .render_tracks(Path::new("tracks.tck"), Path::new("fa.nii.gz"))
        .unwrap_err();

    match error {
        FigureError::ExternalTool { reason, .. } => assert!(reason.contains("no OpenGL")),
        other => panic!("unexpected error {other}"),
    }
    let calls = logged_lines(&log);
    assert_eq!(calls.len(), 1, "no retry after a failure");
    assert!(!Path::new(&calls[0]).exists());
}

#[test]
fn missing_screenshot_is_an_external_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let executable = fake_mrview(dir.path(), "exit 0");

    let error = bridge(executable)
        .render_tracks(Path::new("tracks.tck"), Path::new("fa.nii.gz"))
        .unwrap_err();

    assert!(matches!(error, FigureError::ExternalTool { .. }));
}

#[test]
fn malformed_screenshot_is_an_external_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let executable = fake_mrview(dir.path(), "echo 'not a png' > screenshot0000.png");

    let error = bridge(executable)
        .render_tracks(Path::new("tracks.tck"), Path::new("fa.nii.gz"))
        .unwrap_err();

    assert!(matches!(error, FigureError::ExternalTool { .. }));
}
