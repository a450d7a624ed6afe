/// Rule files: the target, the ordered replacement rules, and manual follow-ups
use crate::rules::{ReplacementRule, RuleError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rule file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule file: {0}")]
    Parse(String),

    #[error("failed to serialize rule file: {0}")]
    Serialize(String),

    #[error("rule #{index} is invalid")]
    InvalidRule {
        index: usize,
        #[source]
        source: RuleError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFileFormat {
    Yaml,
    Json,
}

impl RuleFileFormat {
    /// `.yaml` and `.yml` are YAML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// File to patch. Relative paths are resolved against the rule file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,

    #[serde(default)]
    pub rules: Vec<ReplacementRule>,

    /// Changes too involved for literal substitution, printed as a checklist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<String>,
}

impl RuleSet {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match RuleFileFormat::from_path(path) {
            RuleFileFormat::Yaml => Self::from_yaml(&content),
            RuleFileFormat::Json => Self::from_json(&content),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let set: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let set: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        set.validate()?;
        Ok(set)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|source| ConfigError::InvalidRule { index, source })?;
        }
        Ok(())
    }

    /// Pick the file to patch: an explicit override wins, otherwise the rule
    /// file's `target`, joined onto `base_dir` when relative.
    pub fn resolve_target(&self, base_dir: &Path, override_target: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = override_target {
            return Some(path.to_path_buf());
        }
        self.target.as_ref().map(|target| {
            if target.is_absolute() {
                target.clone()
            } else {
                base_dir.join(target)
            }
        })
    }
}
