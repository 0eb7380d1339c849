use crate::cli_args::PresetsArgs;
use crate::{determine_project_root, resolve_preset_paths};
use anyhow::{Context, Result};
use colored::Colorize;
use monofile_core::{self as core, DEFAULT_RULE_NAME, GlobalConfig};

pub fn handle_presets_command(args: PresetsArgs) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    let preset_paths = resolve_preset_paths(&project_root, &args.project)?;
    let config = core::load_documents(&preset_paths, &project_root)
        .context("Failed to load preset documents")?;

    match args.format.format.as_deref().unwrap_or("text") {
        "json" => println!("{}", serde_json::to_string_pretty(&config)?),
        "yaml" => print!("{}", serde_yml::to_string(&config)?),
        _ => print_text(&config),
    }
    Ok(())
}

fn print_text(config: &GlobalConfig) {
    if config.rule_groups.is_empty() {
        println!("No preset groups loaded.");
    }
    for group in &config.rule_groups {
        let state = if group.is_effective() {
            "active".green()
        } else if !group.enabled {
            "disabled".red()
        } else {
            "inactive".yellow()
        };
        println!(
            "{} (priority {}, {})",
            group.name.bold(),
            group.priority,
            state
        );
        if let Some(description) = &group.description {
            println!("  {}", description);
        }
        if let Some(base) = &group.base_path {
            println!("  base_path: {}", base.display());
        }
        for (name, rule) in &group.rules {
            let marker = if name == DEFAULT_RULE_NAME {
                " (fallback)"
            } else {
                ""
            };
            println!(
                "  - {}{}: extensions {:?}, patterns {:?}",
                name, marker, rule.extensions, rule.patterns
            );
        }
    }
    if !config.per_extension.is_empty() {
        println!(
            "Per-extension overrides: {}",
            config
                .per_extension
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
