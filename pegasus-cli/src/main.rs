//! Pegasus CLI
//!
//! Replays collector output saved as JSON through the aggregation core.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use pegasus_core::{
    build_alerts, build_snapshot, default_alert_rules, diff, triggered_rules, Alert, AlertRule,
    ChangeSet, Config, ProfileBuilder, SourceKind, SourceResultStore, Target, TargetKind,
    TrackingProfile, TrackingReport,
};
use pegasus_runtime::{Coordinator, CoordinatorConfig, ReplayCollector};

#[derive(Parser)]
#[command(name = "pegasus")]
#[command(author, version, about = "Pegasus: multi-source OSINT aggregation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an intelligence profile from saved collector output
    Profile {
        /// Collector output keyed by source name
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Build a snapshot from saved collector output
    Snapshot {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compare two collections and show the alerts they raise
    Diff {
        #[arg(short, long)]
        baseline: PathBuf,

        #[arg(short = 'n', long)]
        current: PathBuf,
    },

    /// Create a tracking profile and feed it later observations
    Track {
        /// Identifier for the tracked target
        #[arg(short, long)]
        target_id: String,

        #[arg(short, long)]
        baseline: PathBuf,

        /// Later collections, applied in order
        #[arg(short, long)]
        observe: Vec<PathBuf>,
    },

    /// Print the alert rule catalog
    Rules,

    /// Detect what kind of target a string names
    Classify { target: String },

    /// Print a config file with every default filled in
    InitConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffOutput<'a> {
    change_set: &'a ChangeSet,
    triggered_rules: Vec<&'a AlertRule>,
    alerts: Vec<Alert>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackOutput<'a> {
    tracking_profile: &'a TrackingProfile,
    report: TrackingReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Logs go to stderr so stdout stays valid JSON
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Profile { input } => {
            let store = load_store(&input, &config).await?;
            let profile = ProfileBuilder::new(config.profile.clone()).build(&store);
            print_json(&profile)?;
        }
        Commands::Snapshot { input } => {
            let store = load_store(&input, &config).await?;
            print_json(&build_snapshot(&store))?;
        }
        Commands::Diff { baseline, current } => {
            let baseline = build_snapshot(&load_store(&baseline, &config).await?);
            let current = build_snapshot(&load_store(&current, &config).await?);
            let change_set = diff(&baseline, &current);
            let rules = default_alert_rules();
            let output = DiffOutput {
                triggered_rules: triggered_rules(&change_set, &rules),
                alerts: build_alerts(&change_set, &rules),
                change_set: &change_set,
            };
            print_json(&output)?;
        }
        Commands::Track {
            target_id,
            baseline,
            observe,
        } => {
            let store = load_store(&baseline, &config).await?;
            let mut tracking = TrackingProfile::create_with(target_id, &store, &config.monitoring);
            for path in &observe {
                let store = load_store(path, &config).await?;
                tracking.observe(&store);
            }
            let output = TrackOutput {
                report: tracking.report(Utc::now()),
                tracking_profile: &tracking,
            };
            print_json(&output)?;
        }
        Commands::Rules => {
            print_json(&default_alert_rules())?;
        }
        Commands::Classify { target } => {
            print_json(&classify_target(&target))?;
        }
        Commands::InitConfig => {
            print!("{}", Config::default_template());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(Config::default());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    Config::from_toml_str(&data).with_context(|| format!("invalid config {}", path.display()))
}

/// Replay a saved collection through the coordinator so the store is joined
/// and stamped the same way a live run would be
async fn load_store(path: &Path, config: &Config) -> Result<SourceResultStore> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&data)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let Value::Object(sources) = value else {
        bail!("{} must contain a JSON object keyed by source", path.display());
    };

    let mut coordinator = Coordinator::new(CoordinatorConfig::from(&config.runtime));
    for (name, result) in sources {
        match name.parse::<SourceKind>() {
            Ok(source) => coordinator.register(Box::new(ReplayCollector::new(source, result))),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    let target = Target::new(TargetKind::File, path.display().to_string());
    Ok(coordinator.run(&target).await)
}

/// Strings that name an existing path are files; everything else goes
/// through the classifier
fn classify_target(raw: &str) -> Target {
    let trimmed = raw.trim();
    if Path::new(trimmed).is_file() {
        Target::new(TargetKind::File, trimmed)
    } else {
        Target::detect(trimmed)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}
