use crate::error::Result;
use crate::gather::FileEntry;
use crate::matcher::{MatchAxis, RuleMatcher};
use crate::presets::{DEFAULT_RULE_NAME, GlobalConfig, Rule};
use crate::settings::{Settings, SettingsPatch};
use serde::Serialize;
use std::path::PathBuf;

/// One applied configuration layer, in application order. The trace is a side
/// output of resolution itself; it is never reconstructed by a second pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum TraceLayer {
    BuiltinDefaults,
    GlobalDefaults,
    ExtensionDefaults {
        extension: String,
    },
    RuleMatch {
        group: String,
        rule: String,
        axis: MatchAxis,
    },
    DefaultRuleFallback {
        group: String,
    },
    CliOverrides,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionTrace {
    pub path: PathBuf,
    pub layers: Vec<TraceLayer>,
}

impl ResolutionTrace {
    /// The (group, rule) pair that decided this file, if any rule matched.
    pub fn matched_rule(&self) -> Option<(&str, &str)> {
        self.layers.iter().find_map(|layer| match layer {
            TraceLayer::RuleMatch { group, rule, .. } => Some((group.as_str(), rule.as_str())),
            TraceLayer::DefaultRuleFallback { group } => {
                Some((group.as_str(), DEFAULT_RULE_NAME))
            }
            _ => None,
        })
    }
}

struct Candidate<'a> {
    group_name: &'a str,
    rule_name: &'a str,
    rule: &'a Rule,
    matcher: RuleMatcher,
}

/// Precedence-ordered settings resolution. Construction flattens the enabled
/// and active groups into one priority-sorted candidate list and compiles
/// every rule's match specification once; `resolve` is then a pure function
/// of the file and the CLI patch.
pub struct Resolver<'a> {
    config: &'a GlobalConfig,
    candidates: Vec<Candidate<'a>>,
    fallback: Option<Candidate<'a>>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a GlobalConfig) -> Result<Self> {
        let mut candidates = Vec::new();
        let mut fallback = None;
        let mut seen_effective_group = false;

        // `config.rule_groups` is already priority-sorted with stable ties.
        for group in &config.rule_groups {
            if !group.is_effective() {
                log::debug!(
                    "Group '{}' is {}; contributing no rules.",
                    group.name,
                    if group.enabled { "inactive" } else { "disabled" }
                );
                continue;
            }
            for (rule_name, rule) in &group.rules {
                let scope = format!("group '{}', rule '{}'", group.name, rule_name);
                let matcher = RuleMatcher::compile(rule, group.base_path.as_deref(), &scope)?;
                let candidate = Candidate {
                    group_name: &group.name,
                    rule_name,
                    rule,
                    matcher,
                };
                if rule_name == DEFAULT_RULE_NAME {
                    // Only the highest-priority effective group's `default`
                    // rule serves as the global fallback.
                    if !seen_effective_group {
                        fallback = Some(candidate);
                    }
                } else {
                    candidates.push(candidate);
                }
            }
            seen_effective_group = true;
        }

        log::debug!(
            "Resolver ready: {} candidate rule(s), fallback {}.",
            candidates.len(),
            if fallback.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            config,
            candidates,
            fallback,
        })
    }

    /// Apply the precedence chain for one file. Layers, low to high:
    /// built-ins, global defaults, per-extension overrides, the first
    /// matching rule across all groups (first match wins globally), the
    /// `default`-rule fallback when nothing matched, and the CLI patch last.
    pub fn resolve(&self, file: &FileEntry, cli: &SettingsPatch) -> (Settings, ResolutionTrace) {
        let mut settings = Settings::default();
        let mut trace = ResolutionTrace {
            path: file.path.clone(),
            layers: vec![TraceLayer::BuiltinDefaults],
        };

        if !self.config.default_settings.is_empty() {
            self.config.default_settings.apply_to(&mut settings);
            trace.layers.push(TraceLayer::GlobalDefaults);
        }

        if !file.extension.is_empty() {
            if let Some(patch) = self.config.per_extension.get(&file.extension) {
                patch.apply_to(&mut settings);
                trace.layers.push(TraceLayer::ExtensionDefaults {
                    extension: file.extension.clone(),
                });
            }
        }

        let mut matched = false;
        for candidate in &self.candidates {
            if let Some(axis) = candidate.matcher.matches(&file.path, &file.extension) {
                log::trace!(
                    "File '{}' matched rule '{}' in group '{}'",
                    file.path.display(),
                    candidate.rule_name,
                    candidate.group_name
                );
                candidate.rule.overrides.apply_to(&mut settings);
                trace.layers.push(TraceLayer::RuleMatch {
                    group: candidate.group_name.to_string(),
                    rule: candidate.rule_name.to_string(),
                    axis,
                });
                matched = true;
                break;
            }
        }

        if !matched {
            if let Some(fallback) = &self.fallback {
                log::trace!(
                    "File '{}' fell through to the default rule of group '{}'",
                    file.path.display(),
                    fallback.group_name
                );
                fallback.rule.overrides.apply_to(&mut settings);
                trace.layers.push(TraceLayer::DefaultRuleFallback {
                    group: fallback.group_name.to_string(),
                });
            }
        }

        if !cli.is_empty() {
            cli.apply_to(&mut settings);
            trace.layers.push(TraceLayer::CliOverrides);
        }

        (settings, trace)
    }

    /// Convenience wrapper for callers that do not need the trace.
    pub fn resolve_settings(&self, file: &FileEntry, cli: &SettingsPatch) -> Settings {
        self.resolve(file, cli).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::RuleGroup;
    use crate::settings::{ActionKind, SecurityCheckMode, SeparatorStyle};
    use indexmap::IndexMap;

    fn rule(extensions: &[&str], patterns: &[&str], overrides: SettingsPatch) -> Rule {
        Rule {
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            overrides,
        }
    }

    fn group(name: &str, priority: i64, rules: Vec<(&str, Rule)>) -> RuleGroup {
        RuleGroup {
            name: name.to_string(),
            priority,
            rules: rules
                .into_iter()
                .map(|(n, r)| (n.to_string(), r))
                .collect::<IndexMap<_, _>>(),
            ..Default::default()
        }
    }

    fn config_with_groups(mut groups: Vec<RuleGroup>) -> GlobalConfig {
        groups.sort_by_key(|g| std::cmp::Reverse(g.priority));
        GlobalConfig {
            rule_groups: groups,
            ..Default::default()
        }
    }

    fn actions_patch(actions: &[ActionKind]) -> SettingsPatch {
        SettingsPatch {
            actions: Some(actions.to_vec()),
            ..Default::default()
        }
    }

    fn file(path: &str) -> FileEntry {
        FileEntry::new(path, 100)
    }

    #[test]
    fn resolution_is_deterministic() {
        let config = config_with_groups(vec![group(
            "web",
            10,
            vec![("js", rule(&[".js"], &[], actions_patch(&[ActionKind::Minify])))],
        )]);
        let resolver = Resolver::new(&config).unwrap();
        let entry = file("app.js");
        let first = resolver.resolve_settings(&entry, &SettingsPatch::default());
        let second = resolver.resolve_settings(&entry, &SettingsPatch::default());
        assert_eq!(first, second);
    }

    #[test]
    fn higher_priority_group_wins_first_match() {
        // Group `web` (10) matches by extension, group `strict` (20) by
        // pattern; the priority-20 rule must decide the actions.
        let config = config_with_groups(vec![
            group(
                "web",
                10,
                vec![("js", rule(&[".js"], &[], actions_patch(&[ActionKind::Minify])))],
            ),
            group(
                "strict",
                20,
                vec![(
                    "all",
                    rule(&[], &["**/*"], actions_patch(&[ActionKind::StripComments])),
                )],
            ),
        ]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, trace) = resolver.resolve(&file("app.js"), &SettingsPatch::default());
        assert_eq!(settings.actions, vec![ActionKind::StripComments]);
        assert_eq!(trace.matched_rule(), Some(("strict", "all")));
    }

    #[test]
    fn equal_priority_ties_break_by_load_order() {
        let config = config_with_groups(vec![
            group(
                "first",
                5,
                vec![("any", rule(&[], &["**/*"], actions_patch(&[ActionKind::Minify])))],
            ),
            group(
                "second",
                5,
                vec![(
                    "any",
                    rule(&[], &["**/*"], actions_patch(&[ActionKind::StripTags])),
                )],
            ),
        ]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, trace) = resolver.resolve(&file("x.txt"), &SettingsPatch::default());
        assert_eq!(settings.actions, vec![ActionKind::Minify]);
        assert_eq!(trace.matched_rule(), Some(("first", "any")));
    }

    #[test]
    fn rule_order_within_group_is_first_match() {
        let config = config_with_groups(vec![group(
            "docs",
            0,
            vec![
                (
                    "readme",
                    rule(&[], &["README.md"], actions_patch(&[ActionKind::JoinParagraphs])),
                ),
                (
                    "markdown",
                    rule(&[".md"], &[], actions_patch(&[ActionKind::CompressWhitespace])),
                ),
            ],
        )]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, _) = resolver.resolve(&file("README.md"), &SettingsPatch::default());
        assert_eq!(settings.actions, vec![ActionKind::JoinParagraphs]);
        let (other, _) = resolver.resolve(&file("docs/guide.md"), &SettingsPatch::default());
        assert_eq!(other.actions, vec![ActionKind::CompressWhitespace]);
    }

    #[test]
    fn lists_replace_rather_than_merge_across_scopes() {
        let mut config = config_with_groups(vec![group(
            "g",
            0,
            vec![("c", rule(&[".txt"], &[], actions_patch(&[ActionKind::Custom])))],
        )]);
        config.default_settings =
            actions_patch(&[ActionKind::Minify, ActionKind::StripComments]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, _) = resolver.resolve(&file("a.txt"), &SettingsPatch::default());
        assert_eq!(settings.actions, vec![ActionKind::Custom]);
    }

    #[test]
    fn cli_overrides_beat_every_layer() {
        let mut config = config_with_groups(vec![group(
            "g",
            50,
            vec![(
                "all",
                rule(
                    &[],
                    &["**/*"],
                    SettingsPatch {
                        security_check: Some(SecurityCheckMode::Warn),
                        separator_style: Some(SeparatorStyle::Markdown),
                        ..Default::default()
                    },
                ),
            )],
        )]);
        config.default_settings.security_check = Some(SecurityCheckMode::Skip);
        let resolver = Resolver::new(&config).unwrap();

        let cli = SettingsPatch {
            security_check: Some(SecurityCheckMode::Error),
            ..Default::default()
        };
        let (settings, trace) = resolver.resolve(&file("x.py"), &cli);
        assert_eq!(settings.security_check, SecurityCheckMode::Error);
        // Fields the CLI did not set keep the rule's value.
        assert_eq!(settings.separator_style, SeparatorStyle::Markdown);
        assert_eq!(trace.layers.last(), Some(&TraceLayer::CliOverrides));
    }

    #[test]
    fn per_extension_layer_applies_between_defaults_and_rules() {
        let mut config = GlobalConfig::default();
        config.default_settings.security_check = Some(SecurityCheckMode::Warn);
        config.per_extension.insert(
            ".env".to_string(),
            SettingsPatch {
                security_check: Some(SecurityCheckMode::Error),
                ..Default::default()
            },
        );
        let resolver = Resolver::new(&config).unwrap();
        let (settings, _) = resolver.resolve(&file("config/.env"), &SettingsPatch::default());
        assert_eq!(settings.security_check, SecurityCheckMode::Error);
        let (other, _) = resolver.resolve(&file("main.py"), &SettingsPatch::default());
        assert_eq!(other.security_check, SecurityCheckMode::Warn);
    }

    #[test]
    fn default_rule_catches_unmatched_files() {
        let config = config_with_groups(vec![group(
            "only",
            0,
            vec![
                ("js", rule(&[".js"], &[], actions_patch(&[ActionKind::Minify]))),
                (
                    "default",
                    rule(&[], &[], actions_patch(&[ActionKind::RemoveEmptyLines])),
                ),
            ],
        )]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, trace) = resolver.resolve(&file("notes.txt"), &SettingsPatch::default());
        assert_eq!(settings.actions, vec![ActionKind::RemoveEmptyLines]);
        assert_eq!(trace.matched_rule(), Some(("only", "default")));

        // A file matched by an explicit rule never reaches the fallback.
        let (js, _) = resolver.resolve(&file("app.js"), &SettingsPatch::default());
        assert_eq!(js.actions, vec![ActionKind::Minify]);
    }

    #[test]
    fn default_rule_of_lower_priority_group_is_ignored() {
        let config = config_with_groups(vec![
            group("top", 10, vec![("js", rule(&[".js"], &[], SettingsPatch::default()))]),
            group(
                "low",
                1,
                vec![(
                    "default",
                    rule(&[], &[], actions_patch(&[ActionKind::Minify])),
                )],
            ),
        ]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, trace) = resolver.resolve(&file("notes.txt"), &SettingsPatch::default());
        assert!(settings.actions.is_empty());
        assert_eq!(trace.matched_rule(), None);
    }

    #[test]
    fn disabled_and_inactive_groups_contribute_nothing() {
        let mut disabled = group(
            "off",
            100,
            vec![("all", rule(&[], &["**/*"], actions_patch(&[ActionKind::Minify])))],
        );
        disabled.enabled = false;
        let mut inactive = group(
            "cond",
            90,
            vec![("all", rule(&[], &["**/*"], actions_patch(&[ActionKind::StripTags])))],
        );
        inactive.active = false;
        let enabled = group(
            "on",
            1,
            vec![(
                "all",
                rule(&[], &["**/*"], actions_patch(&[ActionKind::CompressWhitespace])),
            )],
        );
        let config = config_with_groups(vec![disabled, inactive, enabled]);
        let resolver = Resolver::new(&config).unwrap();
        let (settings, _) = resolver.resolve(&file("x"), &SettingsPatch::default());
        assert_eq!(settings.actions, vec![ActionKind::CompressWhitespace]);
    }

    #[test]
    fn trace_reports_layers_in_application_order() {
        let mut config = config_with_groups(vec![group(
            "g",
            0,
            vec![("py", rule(&[".py"], &[], SettingsPatch::default()))],
        )]);
        config.default_settings.include_hidden = Some(true);
        config
            .per_extension
            .insert(".py".to_string(), SettingsPatch::default());
        let resolver = Resolver::new(&config).unwrap();
        let cli = SettingsPatch {
            max_lines: Some(5),
            ..Default::default()
        };
        let (_, trace) = resolver.resolve(&file("main.py"), &cli);
        let kinds: Vec<&TraceLayer> = trace.layers.iter().collect();
        assert!(matches!(kinds[0], TraceLayer::BuiltinDefaults));
        assert!(matches!(kinds[1], TraceLayer::GlobalDefaults));
        assert!(matches!(kinds[2], TraceLayer::ExtensionDefaults { .. }));
        assert!(matches!(kinds[3], TraceLayer::RuleMatch { .. }));
        assert!(matches!(kinds[4], TraceLayer::CliOverrides));
    }
}
