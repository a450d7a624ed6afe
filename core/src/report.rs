//! Human-readable progress output for a patch run.
//!
//! Free-form text meant for a terminal; nothing here is meant to be parsed.

use crate::patch::{PatchPreview, PatchReport};
use crate::rules::RuleOutcome;
use std::io::{self, Write};

pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn report(&mut self, report: &PatchReport, follow_ups: &[String]) -> io::Result<()> {
        writeln!(self.out, "✅ Backup created: {}", report.backup.path.display())?;
        self.outcomes(&report.outcomes)?;

        writeln!(self.out)?;
        if report.applied_count() == 0 {
            writeln!(
                self.out,
                "Nothing to change in {}: none of {} rules matched",
                report.target.display(),
                report.outcomes.len()
            )?;
        } else if !report.changed {
            writeln!(
                self.out,
                "{} of {} rules matched in {}, but the text is unchanged",
                report.applied_count(),
                report.outcomes.len(),
                report.target.display()
            )?;
        } else {
            writeln!(
                self.out,
                "🎉 Updated {}: {} of {} rules applied, {} replacement{}",
                report.target.display(),
                report.applied_count(),
                report.outcomes.len(),
                report.total_replacements(),
                plural(report.total_replacements())
            )?;
        }

        self.follow_ups(follow_ups)?;

        writeln!(
            self.out,
            "\n💡 If anything breaks, restore from: {}",
            report.backup.path.display()
        )?;
        self.out.flush()
    }

    pub fn preview(&mut self, preview: &PatchPreview, follow_ups: &[String]) -> io::Result<()> {
        writeln!(self.out, "Dry run for {} (nothing written)", preview.target.display())?;
        self.outcomes(&preview.outcomes)?;
        writeln!(
            self.out,
            "\n{} of {} rules would apply",
            preview.outcomes.len() - preview.noop_count(),
            preview.outcomes.len()
        )?;
        self.follow_ups(follow_ups)?;
        self.out.flush()
    }

    fn outcomes(&mut self, outcomes: &[RuleOutcome]) -> io::Result<()> {
        for outcome in outcomes {
            match outcome.replacements {
                0 => writeln!(
                    self.out,
                    "⚠️  Skipped (pattern not found): {}",
                    outcome.label
                )?,
                1 => writeln!(self.out, "✅ {}", outcome.label)?,
                n => writeln!(self.out, "✅ {} ({n} replacements)", outcome.label)?,
            }
        }
        Ok(())
    }

    fn follow_ups(&mut self, follow_ups: &[String]) -> io::Result<()> {
        if follow_ups.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "\n⚠️  Still needs manual follow-up:")?;
        for (index, item) in follow_ups.iter().enumerate() {
            writeln!(self.out, "{}. {}", index + 1, item)?;
        }
        Ok(())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
