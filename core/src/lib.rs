pub mod backup;
pub mod config;
pub mod patch;
pub mod report;
pub mod rules;
mod time;

pub use backup::{BackupError, BackupRecord};
pub use config::{ConfigError, RuleFileFormat, RuleSet};
pub use patch::{
    patch_file, patch_file_with, preview, PatchError, PatchOptions, PatchPreview, PatchReport,
    WriteStage,
};
pub use report::Reporter;
pub use rules::{apply_rules, ReplacementRule, RuleError, RuleOutcome, Scope};
pub use time::backup_stamp;
