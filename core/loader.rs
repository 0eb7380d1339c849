use crate::error::{AppError, Result};
use crate::matcher::normalize_extension;
use crate::presets::{GlobalConfig, RuleGroup};
use crate::settings::SettingsPatch;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Hard ceiling on a single configuration document. Checked against file
/// metadata before any parsing happens.
pub const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;

/// Reserved top-level key holding global defaults and per-extension
/// overrides. Every other top-level key names a rule group.
pub const GLOBALS_KEY: &str = "globals";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GlobalsSection {
    defaults: Option<SettingsPatch>,
    extensions: Option<IndexMap<String, SettingsPatch>>,
}

/// Load and merge configuration documents in caller order. Later documents
/// override earlier ones at group granularity: a group redefined in a later
/// document fully replaces the earlier definition (no field-level merge) but
/// keeps its original position, which is what breaks priority ties.
pub fn load_documents(paths: &[PathBuf], project_root: &Path) -> Result<GlobalConfig> {
    let mut default_settings = SettingsPatch::default();
    let mut per_extension: IndexMap<String, SettingsPatch> = IndexMap::new();
    let mut groups: IndexMap<String, RuleGroup> = IndexMap::new();

    for path in paths {
        log::info!("Loading preset document: {}", path.display());
        let document = read_document(path)?;

        for (key, value) in document {
            if key == GLOBALS_KEY {
                let section: GlobalsSection =
                    serde_yml::from_value(value).map_err(|e| AppError::YamlParse(format!(
                        "Error in '{}' section of '{}': {}",
                        GLOBALS_KEY,
                        path.display(),
                        e
                    )))?;
                if let Some(defaults) = section.defaults {
                    log::debug!("Applying global defaults from {}", path.display());
                    default_settings = defaults;
                }
                if let Some(extensions) = section.extensions {
                    log::debug!(
                        "Applying {} per-extension override(s) from {}",
                        extensions.len(),
                        path.display()
                    );
                    per_extension = extensions
                        .into_iter()
                        .map(|(ext, patch)| (normalize_extension(&ext), patch))
                        .collect();
                }
                continue;
            }

            let mut group: RuleGroup =
                serde_yml::from_value(value).map_err(|e| AppError::YamlParse(format!(
                    "Error in group '{}' of '{}': {}",
                    key,
                    path.display(),
                    e
                )))?;
            group.name = key.clone();
            if groups.contains_key(&key) {
                log::debug!(
                    "Group '{}' redefined by {}; replacing earlier definition",
                    key,
                    path.display()
                );
            }
            // IndexMap keeps the first insertion position, so the earliest
            // definition site still decides priority ties after replacement.
            groups.insert(key, group);
        }
    }

    validate_patch_processor(&default_settings, GLOBALS_KEY, "defaults")?;
    for (ext, patch) in &per_extension {
        validate_patch_processor(patch, GLOBALS_KEY, ext)?;
    }

    let mut rule_groups: Vec<RuleGroup> = groups.into_values().collect();
    for group in &mut rule_groups {
        validate_group(group)?;
        resolve_activation(group, project_root);
    }

    // Stable sort: equal priorities keep merged-configuration order.
    rule_groups.sort_by_key(|g| std::cmp::Reverse(g.priority));

    log::info!(
        "Loaded {} group(s) and {} per-extension override(s).",
        rule_groups.len(),
        per_extension.len()
    );
    Ok(GlobalConfig {
        default_settings,
        per_extension,
        rule_groups,
    })
}

fn read_document(path: &Path) -> Result<IndexMap<String, serde_yml::Value>> {
    let metadata = fs::metadata(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(AppError::ConfigTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_CONFIG_SIZE,
        });
    }

    let content = fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if content.trim().is_empty() {
        log::warn!("Preset document '{}' is empty.", path.display());
        return Ok(IndexMap::new());
    }
    serde_yml::from_str(&content).map_err(|e| {
        AppError::YamlParse(format!(
            "Error parsing preset document '{}': {}. Check YAML syntax and structure.",
            path.display(),
            e
        ))
    })
}

fn validate_group(group: &RuleGroup) -> Result<()> {
    if let Some(base) = &group.base_path {
        ensure_within_root(&group.name, base)?;
    }
    if let Some(condition) = &group.activate_if_exists {
        ensure_within_root(&group.name, condition)?;
    }

    for (rule_name, rule) in &group.rules {
        for pattern in &rule.patterns {
            if pattern.starts_with('!') {
                return Err(AppError::UnsupportedPatternSyntax {
                    group: group.name.clone(),
                    rule: rule_name.clone(),
                    pattern: pattern.clone(),
                });
            }
            // Patterns double as paths once the base path is prepended, so
            // they fall under the same containment boundary.
            if pattern.starts_with('/') || pattern.split('/').any(|seg| seg == "..") {
                return Err(AppError::PathEscapesRoot {
                    group: group.name.clone(),
                    path: PathBuf::from(pattern),
                });
            }
        }
        if let Some(name) = &rule.overrides.custom_processor {
            if !is_valid_processor_name(name) {
                return Err(AppError::InvalidProcessorName {
                    group: group.name.clone(),
                    rule: rule_name.clone(),
                    name: name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_patch_processor(patch: &SettingsPatch, group: &str, rule: &str) -> Result<()> {
    if let Some(name) = &patch.custom_processor {
        if !is_valid_processor_name(name) {
            return Err(AppError::InvalidProcessorName {
                group: group.to_string(),
                rule: rule.to_string(),
                name: name.clone(),
            });
        }
    }
    Ok(())
}

fn resolve_activation(group: &mut RuleGroup, project_root: &Path) {
    if let Some(condition) = &group.activate_if_exists {
        group.active = project_root.join(condition).exists();
        log::debug!(
            "Group '{}' activation condition '{}': {}",
            group.name,
            condition.display(),
            if group.active { "met" } else { "not met" }
        );
    }
}

fn is_valid_processor_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lexical containment check: the path must be relative and must never
/// traverse above the project root. This is a security boundary; the path is
/// not required to exist.
fn ensure_within_root(group: &str, candidate: &Path) -> Result<()> {
    let escapes = || AppError::PathEscapesRoot {
        group: group.to_string(),
        path: candidate.to_path_buf(),
    };

    if candidate.is_absolute() {
        return Err(escapes());
    }
    let mut depth: i64 = 0;
    for component in candidate.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(escapes());
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }
    Ok(())
}
