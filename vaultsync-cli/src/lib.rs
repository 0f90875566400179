//! Loading, merging and saving replica snapshots for the `vaultsync` binary.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vaultsync_merge::{MergeConfig, MergeReport, Merger};
use vaultsync_model::Database;

/// What one invocation should do.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Where the merged target goes; the target file itself when unset.
    pub output: Option<PathBuf>,
    pub config: MergeConfig,
    /// Merge in memory and report, but write nothing.
    pub dry_run: bool,
}

/// Reads a replica snapshot and checks its tree.
pub fn load_database(path: &Path) -> Result<Database> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read replica {}", path.display()))?;
    let db: Database = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse replica {}", path.display()))?;
    db.validate()
        .with_context(|| format!("Replica {} is inconsistent", path.display()))?;
    debug!(
        "Loaded {} groups and {} entries from {:?}",
        db.groups().count(),
        db.entries().count(),
        path
    );
    Ok(db)
}

pub fn save_database(db: &Database, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(db).context("Failed to encode replica")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Reads a [`MergeConfig`] from a JSON file.
pub fn load_config(path: &Path) -> Result<MergeConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    MergeConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

/// Merges the source snapshot into the target snapshot.
///
/// The merged target is written only when something changed and the job is
/// not a dry run.
pub fn run(job: &MergeJob) -> Result<MergeReport> {
    let source = load_database(&job.source)?;
    let mut target = load_database(&job.target)?;

    let report = Merger::new(&source, &mut target)
        .with_config(&job.config)
        .merge()
        .context("Merge failed")?;

    if job.dry_run {
        info!("Dry run: {} changes not written", report.len());
    } else if target.is_modified() {
        let output = job.output.as_deref().unwrap_or(job.target.as_path());
        save_database(&target, output)?;
        info!("Wrote merged replica to {:?}", output);
    } else {
        info!("Nothing to merge");
    }
    Ok(report)
}
