use crate::cli_args::ResolveArgs;
use crate::{determine_project_root, resolve_preset_paths};
use anyhow::{Context, Result};
use colored::Colorize;
use monofile_core::{
    self as core, FileEntry, ResolutionTrace, Resolver, Settings, TraceLayer,
};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ResolveReport {
    file: FileEntry,
    settings: Settings,
    trace: ResolutionTrace,
}

pub fn handle_resolve_command(args: ResolveArgs) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    let preset_paths = resolve_preset_paths(&project_root, &args.project)?;
    let config = core::load_documents(&preset_paths, &project_root)
        .context("Failed to load preset documents")?;
    let resolver = Resolver::new(&config).context("Failed to build settings resolver")?;
    let cli_patch = args.overrides.to_patch()?;

    let mut reports = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let entry = entry_for(&project_root, path)?;
        let (settings, trace) = resolver.resolve(&entry, &cli_patch);
        reports.push(ResolveReport {
            file: entry,
            settings,
            trace,
        });
    }

    match args.format.format.as_deref().unwrap_or("text") {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        "yaml" => print!("{}", serde_yml::to_string(&reports)?),
        _ => {
            for report in &reports {
                print_text_report(report);
            }
        }
    }
    Ok(())
}

fn entry_for(project_root: &Path, path: &Path) -> Result<FileEntry> {
    let relative = path.strip_prefix(project_root).unwrap_or(path).to_path_buf();
    let absolute = project_root.join(&relative);
    // Resolution only needs metadata; a missing file still resolves, it just
    // reports a zero size.
    let size = fs::metadata(&absolute).map(|m| m.len()).unwrap_or(0);
    Ok(FileEntry::new(relative, size))
}

fn print_text_report(report: &ResolveReport) {
    println!("{}", report.file.path.display().to_string().bold());
    for layer in &report.trace.layers {
        println!("  {}", describe_layer(layer));
    }
    let actions: Vec<&str> = report.settings.actions.iter().map(|a| a.as_str()).collect();
    println!(
        "  -> actions: [{}], security_check: {:?}, separator: {:?}",
        actions.join(", "),
        report.settings.security_check,
        report.settings.separator_style
    );
    println!();
}

fn describe_layer(layer: &TraceLayer) -> String {
    match layer {
        TraceLayer::BuiltinDefaults => "builtin defaults".to_string(),
        TraceLayer::GlobalDefaults => "global defaults".to_string(),
        TraceLayer::ExtensionDefaults { extension } => {
            format!("per-extension defaults ({})", extension)
        }
        TraceLayer::RuleMatch { group, rule, axis } => {
            format!("rule match: group '{}', rule '{}' ({:?})", group, rule, axis)
        }
        TraceLayer::DefaultRuleFallback { group } => {
            format!("default rule fallback: group '{}'", group)
        }
        TraceLayer::CliOverrides => "cli overrides".to_string(),
    }
}
