use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use controller::{AdjusterConfig, SpeedAdjuster};
use sim::{Drive, Environment};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    Commute,
    Storm,
    Mountain,
    RushHour,
}

impl From<Scenario> for sim::Scenario {
    fn from(s: Scenario) -> Self {
        match s {
            Scenario::Commute => sim::Scenario::Commute,
            Scenario::Storm => sim::Scenario::Storm,
            Scenario::Mountain => sim::Scenario::Mountain,
            Scenario::RushHour => sim::Scenario::RushHour,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "speed-adjuster",
    version,
    about = "Rule-based target speed from road condition, traffic and slope"
)]
struct Args {
    /// JSON file with adjuster settings, e.g. {"speed_limit": 80.0}
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Speed limit; overrides the config file
    #[arg(long, global = true)]
    speed_limit: Option<f64>,

    /// Cap output at speed_limit - 10
    #[arg(long, global = true)]
    safety: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a single target speed
    Once {
        /// clear, wet or icy
        #[arg(long)]
        road: String,

        /// Traffic density, nominally 0..=100
        #[arg(long, allow_hyphen_values = true)]
        traffic: i32,

        /// Slope angle, nominally -10..=10 (positive is uphill)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        slope: i32,
    },
    /// Run a simulated drive and print a JSONL trace
    Drive {
        #[arg(value_enum, long, default_value = "commute")]
        scenario: Scenario,

        /// Number of steps to simulate
        #[arg(long, default_value_t = 200)]
        steps: u64,

        /// RNG seed for deterministic runs
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
}

#[derive(serde::Serialize)]
struct TraceRow {
    step: u64,
    #[serde(flatten)]
    env: Environment,
    safety: bool,
    speed: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = load_config(args.config.as_deref(), args.speed_limit)?;
    log::info!("speed limit {}", cfg.speed_limit);

    let mut adjuster = SpeedAdjuster::from_config(&cfg);
    adjuster.set_safety_mode(args.safety);

    match args.command {
        Command::Once {
            road,
            traffic,
            slope,
        } => {
            let speed = adjuster.update(&road, traffic, slope)?;
            println!("{speed:.2}");
        }
        Command::Drive {
            scenario,
            steps,
            seed,
        } => {
            let mut drive = Drive::from_scenario(scenario.into(), seed);
            // One object per line on stdout
            for _ in 0..steps {
                let env = drive.next_sample();
                let speed =
                    adjuster.update_condition(env.road, env.traffic_density, env.slope_angle);
                let row = TraceRow {
                    step: drive.step_count(),
                    env,
                    safety: adjuster.safety_mode(),
                    speed,
                };
                println!("{}", serde_json::to_string(&row)?);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, speed_limit: Option<f64>) -> Result<AdjusterConfig> {
    let mut cfg = match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .with_context(|| format!("failed to read config {}", p.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse config {}", p.display()))?
        }
        None => AdjusterConfig::default(),
    };
    if let Some(limit) = speed_limit {
        cfg.speed_limit = limit;
    }
    Ok(cfg)
}
