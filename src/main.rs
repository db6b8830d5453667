//! gridviz entry point: CLI wiring, logging, and dashboard startup.

use std::fs::File;
use std::process;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use gridviz::cli::Cli;
use gridviz::config::DashboardConfig;
use gridviz::dashboard::Dashboard;
use gridviz::data::Fetcher;
use gridviz::error::{GridvizError, Result};
use gridviz::io::export::FrameWriter;

fn init_tracing<W>(level: tracing::Level, writer: W, ansi: bool)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .init();
}

fn main() {
    let cli = Cli::parse();

    // The terminal UI owns stdout/stderr, so logs go to a file or nowhere.
    let level = cli.log_level();
    match cli.log_file() {
        Some(path) => match File::create(path) {
            Ok(file) => init_tracing(level, Mutex::new(file), false),
            Err(e) => {
                eprintln!("error: cannot create log file \"{}\": {e}", path.display());
                process::exit(1);
            }
        },
        None if cli.headless => init_tracing(level, std::io::stderr, true),
        None => init_tracing(level, std::io::sink, false),
    }

    let config = match cli.resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    if let Err(e) = run(&cli, config) {
        error!("{e}");
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli, config: DashboardConfig) -> Result<()> {
    info!(dashboard = %config.dashboard.kind, headless = cli.headless, "starting");
    let dashboard = Dashboard::load(config, &Fetcher::new())?;
    if cli.headless {
        run_headless(cli, &dashboard)
    } else {
        run_tui(dashboard)
    }
}

fn run_headless(cli: &Cli, dashboard: &Dashboard) -> Result<()> {
    let steps = cli.steps.unwrap_or(dashboard.config().playback.horizon);
    let summary = match &cli.export {
        Some(path) => {
            let csv_err = |source| GridvizError::Csv {
                source_name: path.display().to_string(),
                source,
            };
            let mut writer = FrameWriter::create(path).map_err(csv_err)?;
            let summary =
                dashboard.run_headless(steps, |scene| writer.write_scene(scene).map_err(csv_err))?;
            let rows = writer.rows();
            writer.finish()?;
            info!(path = %path.display(), rows, "frames exported");
            summary
        }
        None => dashboard.run_headless(steps, |_| Ok(()))?,
    };
    println!(
        "{} frames, {} glyphs, {} lookup misses",
        summary.frames, summary.glyphs, summary.misses
    );
    Ok(())
}

#[cfg(feature = "tui")]
fn run_tui(dashboard: Dashboard) -> Result<()> {
    gridviz::tui::run(dashboard)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_tui(_dashboard: Dashboard) -> Result<()> {
    eprintln!("error: built without the `tui` feature; pass --headless");
    process::exit(1);
}
