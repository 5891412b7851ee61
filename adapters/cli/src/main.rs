#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless horde session.

mod scenario;
mod terrain;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use horde_session::{HordeConfig, HordeSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a headless horde session against a simulated player.
#[derive(Debug, Parser)]
#[command(name = "horde")]
#[command(about = "Headless horde director simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML session configuration. Builtin defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run.
    #[arg(long, default_value_t = 120.0)]
    seconds: f64,

    /// Frames per simulated second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Terrain file of whitespace-separated tile rows.
    #[arg(long)]
    terrain: Option<PathBuf>,

    /// Edge length of one terrain tile in world units.
    #[arg(long, default_value_t = 32.0)]
    tile_size: f32,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the horde command-line interface.
fn main() -> Result<()> {
    install_tracing();
    let cli = Cli::parse();

    if cli.fps == 0 {
        bail!("--fps must be at least 1");
    }
    if !(cli.seconds.is_finite() && cli.seconds >= 0.0) {
        bail!("--seconds must be a non-negative number, got {}", cli.seconds);
    }

    let config = load_config(cli.config.as_deref())?;
    let mut session = HordeSession::new(&config).context("failed to build horde session")?;
    if let Some(path) = &cli.terrain {
        let rows = terrain::load_rows(path)?;
        session
            .load_terrain_rows(&rows, cli.tile_size)
            .with_context(|| format!("terrain in {} was rejected", path.display()))?;
        info!(
            rows = rows.len(),
            path = %path.display(),
            "terrain loaded"
        );
    }

    let report = scenario::run(
        &mut session,
        Duration::from_secs_f64(cli.seconds),
        cli.fps,
    );

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize the report")?;
        println!("{rendered}");
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<HordeConfig> {
    let Some(path) = path else {
        return Ok(HordeConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration at {}", path.display()))?;
    HordeConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid configuration in {}", path.display()))
}
