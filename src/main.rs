use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use codegraph_view::app::CodeGraphApp;
use codegraph_view::settings::Settings;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Workspace directory to visualize.
    #[arg(default_value = ".")]
    root: PathBuf,

    /// JSON settings file; created on first change if missing.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show top-level function nodes regardless of the settings file.
    #[arg(long)]
    show_functions: bool,

    /// Stop scanning after this many files.
    #[arg(long)]
    max_files: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if args.show_functions {
        settings.show_functions = true;
    }
    if let Some(max_files) = args.max_files {
        settings.scan.max_files = max_files;
    }

    let root = args.root;
    info!("viewing {}", root.display());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let config_path = args.config;
    eframe::run_native(
        "codegraph-view",
        options,
        Box::new(move |cc| Ok(Box::new(CodeGraphApp::new(cc, root, settings, config_path)))),
    )
    .map_err(|error| anyhow!("window failed: {error}"))
}
