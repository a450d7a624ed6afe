/// Literal replacement rules and the in-memory applier
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("replacement rule has an empty pattern")]
    EmptyPattern,
}

/// How many occurrences of the pattern a rule rewrites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only the leftmost occurrence.
    #[default]
    Once,
    /// Every non-overlapping occurrence, scanning left to right.
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub find: String,
    pub replace: String,
    #[serde(default)]
    pub scope: Scope,
}

impl ReplacementRule {
    pub fn new(
        find: impl Into<String>,
        replace: impl Into<String>,
        scope: Scope,
    ) -> Result<Self, RuleError> {
        let rule = Self {
            label: None,
            find: find.into(),
            replace: replace.into(),
            scope,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn once(find: impl Into<String>, replace: impl Into<String>) -> Result<Self, RuleError> {
        Self::new(find, replace, Scope::Once)
    }

    pub fn all(find: impl Into<String>, replace: impl Into<String>) -> Result<Self, RuleError> {
        Self::new(find, replace, Scope::All)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.find.is_empty() {
            return Err(RuleError::EmptyPattern);
        }
        Ok(())
    }

    /// Label to show in progress output; falls back to a short preview of the pattern.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("Replaced \"{}\"", preview(&self.find)),
        }
    }

    /// Apply this rule to `text`, returning the rewritten text and the number
    /// of occurrences replaced. A count of zero means `text` was returned as is.
    pub fn apply(&self, text: &str) -> (String, usize) {
        if self.find.is_empty() {
            return (text.to_string(), 0);
        }

        match self.scope {
            Scope::Once => match text.find(&self.find) {
                Some(_) => (text.replacen(&self.find, &self.replace, 1), 1),
                None => (text.to_string(), 0),
            },
            Scope::All => {
                let count = text.matches(&self.find).count();
                if count == 0 {
                    (text.to_string(), 0)
                } else {
                    (text.replace(&self.find, &self.replace), count)
                }
            }
        }
    }
}

/// Result of applying one rule.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub label: String,
    pub scope: Scope,
    pub replacements: usize,
}

impl RuleOutcome {
    pub fn is_noop(&self) -> bool {
        self.replacements == 0
    }
}

/// Apply `rules` in order; each rule sees the output of the one before it.
pub fn apply_rules(text: &str, rules: &[ReplacementRule]) -> (String, Vec<RuleOutcome>) {
    let mut current = text.to_string();
    let mut outcomes = Vec::with_capacity(rules.len());

    for rule in rules {
        let (next, replacements) = rule.apply(&current);
        if replacements == 0 {
            log::warn!("pattern not found, rule skipped: {}", rule.display_label());
        } else {
            log::debug!(
                "{} ({} replacement{})",
                rule.display_label(),
                replacements,
                if replacements == 1 { "" } else { "s" }
            );
            current = next;
        }
        outcomes.push(RuleOutcome {
            label: rule.display_label(),
            scope: rule.scope,
            replacements,
        });
    }

    (current, outcomes)
}

fn preview(pattern: &str) -> String {
    const MAX_CHARS: usize = 40;
    let first_line = pattern.lines().next().unwrap_or_default().trim();
    let mut short: String = first_line.chars().take(MAX_CHARS).collect();
    if first_line.chars().count() > MAX_CHARS || pattern.lines().count() > 1 {
        short.push('…');
    }
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_replaces_only_first_occurrence() {
        let rule = ReplacementRule::once("a", "b").unwrap();
        let (text, count) = rule.apply("a a a");
        assert_eq!(text, "b a a");
        assert_eq!(count, 1);

        let (text, count) = rule.apply(&text);
        assert_eq!(text, "b b a");
        assert_eq!(count, 1);
    }

    #[test]
    fn all_replaces_every_occurrence() {
        let rule = ReplacementRule::all("a", "b").unwrap();
        let (text, count) = rule.apply("a a a");
        assert_eq!(text, "b b b");
        assert_eq!(count, 3);
    }

    #[test]
    fn all_counts_non_overlapping_matches() {
        let rule = ReplacementRule::all("aa", "x").unwrap();
        let (text, count) = rule.apply("aaaaa");
        assert_eq!(text, "xxa");
        assert_eq!(count, 2);
    }

    #[test]
    fn absent_pattern_is_a_noop() {
        let rule = ReplacementRule::once("qqq", "zzz").unwrap();
        let (text, count) = rule.apply("xyz");
        assert_eq!(text, "xyz");
        assert_eq!(count, 0);
    }

    #[test]
    fn replacement_containing_pattern_is_not_reapplied() {
        let rule = ReplacementRule::all("foo", "foofoo").unwrap();
        let (text, count) = rule.apply("foo bar foo");
        assert_eq!(text, "foofoo bar foofoo");
        assert_eq!(count, 2);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert_eq!(
            ReplacementRule::once("", "x").unwrap_err(),
            RuleError::EmptyPattern
        );
    }

    #[test]
    fn rules_apply_in_sequence() {
        let rules = vec![
            ReplacementRule::once("foo", "bar").unwrap(),
            ReplacementRule::all("bar", "baz").unwrap().with_label("bar to baz"),
            ReplacementRule::once("missing", "x").unwrap(),
        ];
        let (text, outcomes) = apply_rules("foo bar", &rules);
        assert_eq!(text, "baz baz");
        assert_eq!(outcomes[0].replacements, 1);
        assert_eq!(outcomes[1].replacements, 2);
        assert_eq!(outcomes[1].label, "bar to baz");
        assert!(outcomes[2].is_noop());
    }

    #[test]
    fn multibyte_text_is_handled() {
        let rule = ReplacementRule::all(
            r#"<DollarSign className="w-8 h-8 text-emerald-500" />"#,
            r#"<span className="text-4xl">💰</span>"#,
        )
        .unwrap();
        let source = r#"<div><DollarSign className="w-8 h-8 text-emerald-500" /> 환영</div>"#;
        let (text, count) = rule.apply(source);
        assert_eq!(count, 1);
        assert_eq!(text, r#"<div><span className="text-4xl">💰</span> 환영</div>"#);
    }

    #[test]
    fn display_label_previews_multiline_patterns() {
        let rule = ReplacementRule::once("} from './helpers';\nimport x", "y").unwrap();
        assert_eq!(rule.display_label(), "Replaced \"} from './helpers';…\"");
    }

    #[test]
    fn scope_defaults_to_once_when_deserialized() {
        let rule: ReplacementRule =
            serde_json::from_str(r#"{"find":"a","replace":"b"}"#).unwrap();
        assert_eq!(rule.scope, Scope::Once);
        assert!(rule.label.is_none());
    }
}
