use std::fs;
use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use volume_figures::{
    Config, DirectoryRepository, FigureRunner, MrviewBridge, OutputRouter, OutputTarget,
};

/// Produce the manuscript figures for every session of a repository
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository laid out as <DATA_DIR>/<subject>/<visit>/<derivative>
    data_dir: PathBuf,

    /// Directory the figures are written to
    #[arg(long, value_name = "DIR", default_value = "figures")]
    fig_dir: PathBuf,

    /// JSON figure definitions; the manuscript figures when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only produce the named figures
    #[arg(short, long = "figure", value_name = "NAME")]
    figures: Vec<String>,

    /// Open each figure in an image viewer instead of saving it
    #[arg(long)]
    show: bool,

    /// mrview executable, overriding the configuration
    #[arg(long, env = "MRVIEW", value_name = "PATH")]
    mrview: Option<PathBuf>,

    /// Command used to open figures with --show
    #[arg(long, value_name = "CMD", default_value = volume_figures::output::DEFAULT_IMAGE_VIEWER)]
    image_viewer: String,

    /// Side in pixels of one figure cell, overriding the configuration
    #[arg(long, value_name = "PIXELS")]
    cell_size: Option<NonZeroU32>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .wrap_err_with(|| format!("loading configuration {}", path.display()))?,
        None => Config::manuscript()?,
    };
    if let Some(mrview) = args.mrview {
        config.viewer.executable = mrview;
    }
    if let Some(cell_size) = args.cell_size {
        config.cell_size = cell_size;
    }
    for name in &args.figures {
        eyre::ensure!(config.figure(name).is_some(), "no figure named `{name}`");
    }

    let repository = DirectoryRepository::open(&args.data_dir)?.with_sort_by(config.dicom_sort);
    let bridge = MrviewBridge::new(config.viewer.clone())?;
    if !args.show {
        fs::create_dir_all(&args.fig_dir)
            .wrap_err_with(|| format!("creating {}", args.fig_dir.display()))?;
    }

    let mut failed = 0;
    for definition in &config.figures {
        if !args.figures.is_empty() && !args.figures.contains(&definition.name) {
            continue;
        }
        let target = if args.show {
            OutputTarget::Display
        } else {
            OutputTarget::File(args.fig_dir.join(format!("{}.png", definition.name)))
        };
        let router = OutputRouter::new(target).with_image_viewer(args.image_viewer.clone());
        let runner = FigureRunner::new(
            &repository,
            &router,
            &bridge,
            config.cell_size,
            config.interpolation,
        );
        let report = runner.run(definition)?;
        failed += report.failures.len();
    }

    if failed > 0 {
        warn!(failed, "some figures could not be produced");
        eyre::bail!("{failed} figure(s) failed");
    }
    Ok(())
}
