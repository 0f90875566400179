//! vaultsync: merge one replica snapshot into another.
//!
//! Usage:
//!   vaultsync --source laptop.json --target desktop.json
//!
//! Both files are JSON replica snapshots. The target is updated in place
//! unless `--output` or `--dry-run` is given.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use vaultsync_cli::{MergeJob, load_config, run};
use vaultsync_merge::{MergeConfig, MergeMode};

#[derive(Parser, Debug)]
#[command(name = "vaultsync")]
#[command(about = "Merge two vaultsync replica snapshots")]
struct Args {
    /// Replica to merge from (read only)
    #[arg(short, long)]
    source: PathBuf,

    /// Replica to merge into
    #[arg(short, long)]
    target: PathBuf,

    /// Write the merged replica here instead of over the target
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Policy for every group, overriding per-group settings
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// JSON merge configuration; --mode takes precedence over it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report changes without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the change list as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    KeepExisting,
    KeepNewer,
    KeepBoth,
    Synchronize,
}

impl From<ModeArg> for MergeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::KeepExisting => Self::KeepExisting,
            ModeArg::KeepNewer => Self::KeepNewer,
            ModeArg::KeepBoth => Self::KeepBoth,
            ModeArg::Synchronize => Self::Synchronize,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => MergeConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.forced_mode = Some(mode.into());
    }

    info!("Merging {:?} into {:?}", args.source, args.target);
    let report = run(&MergeJob {
        source: args.source,
        target: args.target,
        output: args.output,
        config,
        dry_run: args.dry_run,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_empty() {
        println!("No changes");
    } else {
        print!("{report}");
    }
    Ok(())
}
