use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use backpatch_core::{patch_file_with, preview, PatchOptions, Reporter, RuleSet};
use clap::{ArgAction, Parser};
use log::LevelFilter;

/// Back up a file, then apply the literal replacements listed in a rule file.
#[derive(Parser, Debug)]
#[command(name = "backpatch", version, about)]
pub struct Cli {
    /// Rule file (YAML for .yaml/.yml, JSON otherwise)
    pub rules: PathBuf,

    /// File to patch; overrides `target` in the rule file
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Write the backup here instead of next to the target
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    /// Show which rules would apply without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

pub fn run<W: Write>(cli: &Cli, out: W) -> anyhow::Result<()> {
    let set = RuleSet::from_file(&cli.rules)
        .with_context(|| format!("loading rules from {}", cli.rules.display()))?;

    let base_dir = rule_file_dir(&cli.rules);
    let target = set
        .resolve_target(&base_dir, cli.target.as_deref())
        .ok_or_else(|| {
            anyhow!(
                "no target file: pass --target or set `target` in {}",
                cli.rules.display()
            )
        })?;
    let target = dunce::simplified(&target).to_path_buf();
    log::info!(
        "{} rules from {} against {}",
        set.rules.len(),
        cli.rules.display(),
        target.display()
    );

    let mut reporter = Reporter::new(out);

    if cli.dry_run {
        let preview = preview(&target, &set.rules)
            .with_context(|| format!("previewing {}", target.display()))?;
        reporter.preview(&preview, &set.follow_ups)?;
        return Ok(());
    }

    let options = PatchOptions {
        backup_dir: cli.backup_dir.clone(),
        timestamp: None,
    };
    let report = patch_file_with(&target, &set.rules, &options)
        .with_context(|| format!("patching {}", target.display()))?;
    reporter.report(&report, &set.follow_ups)?;
    Ok(())
}

fn rule_file_dir(rules: &Path) -> PathBuf {
    match rules.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
