//! Check a primary UAV mission against recorded traffic and reroute it
//! around conflicts.
//!
//! Usage:
//!   cargo run -p uav-cli --bin deconflict -- \
//!     --primary data/primary_mission.json --simulated data/simulated_drones.json

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uav_cli::{config, load_flight_data, run_pipeline};
use uav_core::{ResolutionConfig, ResolutionOutcome, RetimePolicy};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect and resolve UAV mission conflicts", long_about = None)]
struct Args {
    /// Primary mission JSON ({ waypoints, times })
    #[arg(long)]
    primary: PathBuf,

    /// Simulated drones JSON (array of { id, waypoints, times })
    #[arg(long)]
    simulated: PathBuf,

    /// Safety distance in length units [env: UAV_SAFETY_DISTANCE]
    #[arg(long)]
    safety_distance: Option<f64>,

    /// Time threshold in seconds [env: UAV_TIME_THRESHOLD]
    #[arg(long)]
    time_threshold: Option<f64>,

    /// Grid pitch for rerouting [env: UAV_GRID_SIZE]
    #[arg(long)]
    grid_size: Option<f64>,

    /// Cap on A* node expansions [env: UAV_MAX_EXPANSIONS]
    #[arg(long)]
    max_expansions: Option<usize>,

    /// Block grid cells within this radius of other drones' waypoints [env: UAV_OBSTACLE_CLEARANCE]
    #[arg(long)]
    obstacle_clearance: Option<f64>,

    /// Retime the rerouted path at this speed instead of keeping the original span [env: UAV_RETIME_SPEED]
    #[arg(long)]
    speed: Option<f64>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, mut config: ResolutionConfig) -> ResolutionConfig {
        if let Some(value) = self.safety_distance {
            config.rules.safety_distance = value;
        }
        if let Some(value) = self.time_threshold {
            config.rules.time_threshold = value;
        }
        if let Some(value) = self.grid_size {
            config.planner.grid_size = value;
        }
        if let Some(value) = self.max_expansions {
            config.planner.max_expansions = Some(value);
        }
        if let Some(value) = self.obstacle_clearance {
            config.planner.obstacle_clearance = value;
        }
        if let Some(speed) = self.speed {
            config.retime = RetimePolicy::ConstantSpeed { speed };
        }
        config
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("uav_cli=info,uav_core=info"))?;
    let (plain, structured) = if json {
        (None, Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let config = args.apply(config::from_env());
    config.validate().context("invalid configuration")?;

    let (mut mission, others) = load_flight_data(&args.primary, &args.simulated)?;
    let report = run_pipeline(&mut mission, &others, &config)?;

    match &report.outcome {
        None => tracing::info!("mission is clear"),
        Some(ResolutionOutcome::Rerouted {
            path,
            residual_conflicts,
        }) => tracing::info!(
            waypoints = path.waypoints.len(),
            cost = path.cost,
            residual = residual_conflicts.len(),
            "mission rerouted"
        ),
        Some(ResolutionOutcome::ManualInterventionRequired { reason }) => {
            tracing::warn!(%reason, "manual intervention required")
        }
    }

    let body = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => fs::write(path, body + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", body),
    }

    Ok(())
}
