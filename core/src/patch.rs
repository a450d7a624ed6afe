//! Backup-then-patch: load the target, back it up, apply the rules in memory,
//! then overwrite the target with the result.
//!
//! The backup is written, synced and verified before the target is opened for
//! writing. Nothing here is atomic: if the final write fails the target may be
//! truncated, and the backup is the only copy of the original.

use crate::backup::{self, BackupRecord};
use crate::rules::{apply_rules, ReplacementRule, RuleError, RuleOutcome};
use crate::time;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which write failed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteStage {
    /// The target was not touched.
    Backup,
    /// The backup exists; the target may be partially written.
    Overwrite,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Backup => f.write_str("backup"),
            WriteStage::Overwrite => f.write_str("target"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("target file not found or unreadable: {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {stage} file: {}", .path.display())]
    WriteFailure {
        path: PathBuf,
        stage: WriteStage,
        #[source]
        source: io::Error,
    },

    /// Rejected before the target was read.
    #[error("replacement rule #{index} is invalid")]
    InvalidRule {
        index: usize,
        #[source]
        source: RuleError,
    },
}

impl PatchError {
    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            PatchError::NotFound { .. } | PatchError::InvalidRule { .. } => None,
            PatchError::WriteFailure { stage, .. } => Some(*stage),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Directory for the backup file. Defaults to the target's directory.
    pub backup_dir: Option<PathBuf>,
    /// Time used for the backup stamp. Defaults to now.
    pub timestamp: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchReport {
    pub target: PathBuf,
    pub backup: BackupRecord,
    pub outcomes: Vec<RuleOutcome>,
    pub changed: bool,
}

impl PatchReport {
    /// Rules whose pattern was not found.
    pub fn noop_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_noop()).count()
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.len() - self.noop_count()
    }

    pub fn total_replacements(&self) -> usize {
        self.outcomes.iter().map(|o| o.replacements).sum()
    }
}

/// Outcome of a dry run: what would change, with nothing written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchPreview {
    pub target: PathBuf,
    pub outcomes: Vec<RuleOutcome>,
    pub changed: bool,
    #[serde(skip)]
    pub patched: String,
}

impl PatchPreview {
    pub fn noop_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_noop()).count()
    }
}

pub fn patch_file(target: &Path, rules: &[ReplacementRule]) -> Result<PatchReport, PatchError> {
    patch_file_with(target, rules, &PatchOptions::default())
}

pub fn patch_file_with(
    target: &Path,
    rules: &[ReplacementRule],
    options: &PatchOptions,
) -> Result<PatchReport, PatchError> {
    run(target, rules, options, |path, text| fs::write(path, text))
}

/// The pipeline with the final write supplied by the caller.
fn run<S>(
    target: &Path,
    rules: &[ReplacementRule],
    options: &PatchOptions,
    save: S,
) -> Result<PatchReport, PatchError>
where
    S: FnOnce(&Path, &str) -> io::Result<()>,
{
    validate(rules)?;
    let original = load(target)?;

    let stamp = match &options.timestamp {
        Some(ts) => time::backup_stamp(ts),
        None => time::now_stamp(),
    };
    let backup = backup::write_backup(target, options.backup_dir.as_deref(), &original, &stamp)
        .map_err(|err| PatchError::WriteFailure {
            path: err.path,
            stage: WriteStage::Backup,
            source: err.source,
        })?;
    log::info!("backup created: {}", backup.path.display());

    let (patched, outcomes) = apply_rules(&original, rules);
    let changed = patched != original;

    save(target, &patched).map_err(|source| PatchError::WriteFailure {
        path: target.to_path_buf(),
        stage: WriteStage::Overwrite,
        source,
    })?;
    log::info!(
        "wrote {} ({} of {} rules applied)",
        target.display(),
        outcomes.iter().filter(|o| !o.is_noop()).count(),
        outcomes.len()
    );

    Ok(PatchReport {
        target: target.to_path_buf(),
        backup,
        outcomes,
        changed,
    })
}

/// Load and apply `rules` without writing anything.
pub fn preview(target: &Path, rules: &[ReplacementRule]) -> Result<PatchPreview, PatchError> {
    validate(rules)?;
    let original = load(target)?;
    let (patched, outcomes) = apply_rules(&original, rules);
    Ok(PatchPreview {
        target: target.to_path_buf(),
        changed: patched != original,
        outcomes,
        patched,
    })
}

fn validate(rules: &[ReplacementRule]) -> Result<(), PatchError> {
    for (index, rule) in rules.iter().enumerate() {
        rule.validate()
            .map_err(|source| PatchError::InvalidRule { index, source })?;
    }
    Ok(())
}

fn load(target: &Path) -> Result<String, PatchError> {
    let text = fs::read_to_string(target).map_err(|source| PatchError::NotFound {
        path: target.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {} ({} bytes)", target.display(), text.len());
    Ok(text)
}
