use crate::cli_args::BundleArgs;
use crate::{determine_project_root, resolve_preset_paths};
use anyhow::{Context, Result};
use colored::Colorize;
use monofile_core::{
    self as core, EngineOptions, GatherOptions, ProcessorRegistry, RegexScanner, Resolver,
};

pub fn handle_bundle_command(args: BundleArgs, quiet: bool) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let preset_paths = resolve_preset_paths(&project_root, &args.project)?;
    let config = core::load_documents(&preset_paths, &project_root)
        .context("Failed to load preset documents")?;
    let resolver = Resolver::new(&config).context("Failed to build settings resolver")?;
    let cli_patch = args.overrides.to_patch()?;

    let gather_options = GatherOptions {
        include: args.filters.include.clone(),
        exclude: args.filters.exclude.clone(),
        use_gitignore: !args.filters.no_gitignore,
    };
    let files = core::gather_files(&project_root, &gather_options)
        .context("Failed to gather project files")?;

    let registry = ProcessorRegistry::builtin();
    let report = core::process_files(
        &project_root,
        files,
        &resolver,
        &cli_patch,
        &registry,
        &RegexScanner,
        &EngineOptions {
            strict: args.strict,
        },
    )
    .context("Failed to process files")?;

    let bundle = core::assemble(&report.processed);
    core::write_output(&bundle, args.output.as_deref()).context("Failed to write bundle")?;

    if !quiet {
        eprintln!(
            "{} {} file(s) bundled, {} skipped, {} failed.",
            "Done:".green().bold(),
            report.processed.len(),
            report.skipped.len(),
            report.failures.len()
        );
        for failure in &report.failures {
            eprintln!(" - {}", failure.yellow());
        }
    }
    Ok(())
}
