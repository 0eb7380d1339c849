use crate::settings::SettingsPatch;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name reserved for a group's fallback rule. It is skipped by the ordinary
/// first-match walk and only applied when no rule in any group matched.
pub const DEFAULT_RULE_NAME: &str = "default";

/// A preset: a match specification plus the settings overrides and action
/// list that apply when it wins resolution. The override fields are flattened
/// into the rule body, so a document reads:
///
/// ```yaml
/// rules:
///   js:
///     extensions: [".js"]
///     actions: [strip_comments, minify]
///     separator_style: markdown
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(flatten)]
    pub overrides: SettingsPatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// The mapping key in the configuration document; filled in by the loader.
    #[serde(skip_deserializing)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    /// Group is only active when this path exists under the project root.
    /// Checked exactly once, at load time.
    #[serde(default)]
    pub activate_if_exists: Option<PathBuf>,
    #[serde(default)]
    pub rules: IndexMap<String, Rule>,
    /// Result of the activation check, frozen by the loader.
    #[serde(skip_deserializing, default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RuleGroup {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            enabled: true,
            priority: 0,
            base_path: None,
            activate_if_exists: None,
            rules: IndexMap::new(),
            active: true,
        }
    }
}

impl RuleGroup {
    /// Whether this group contributes rules to resolution.
    pub fn is_effective(&self) -> bool {
        self.enabled && self.active
    }
}

/// The merged, validated configuration. Built once per invocation by the
/// loader, read-only afterwards; safe to share across workers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GlobalConfig {
    /// User-supplied global defaults, applied on top of the built-ins.
    pub default_settings: SettingsPatch,
    /// Per-extension overrides, keyed by normalized extension. Applied
    /// between the global defaults and any matched rule.
    pub per_extension: IndexMap<String, SettingsPatch>,
    /// Groups sorted by priority descending; load order breaks ties.
    pub rule_groups: Vec<RuleGroup>,
}
