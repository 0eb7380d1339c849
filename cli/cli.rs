mod cli_args;
mod commands;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, ProjectOpts};
use monofile_core::AppError;

pub const DEFAULT_PRESET_FILENAME: &str = "monofile.yaml";

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<AppError>();
            let exit_code = match core_err {
                Some(AppError::Config(_)) => 1,
                Some(AppError::YamlParse(_)) => 1,
                Some(AppError::ConfigTooLarge { .. }) => 1,
                Some(AppError::InvalidProcessorName { .. }) => 1,
                Some(AppError::PathEscapesRoot { .. }) => 1,
                Some(AppError::UnsupportedPatternSyntax { .. }) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::Ignore(_)) => 2,
                Some(AppError::Glob { .. }) => 2,
                Some(AppError::UnknownProcessor { .. }) => 3,
                Some(AppError::ProcessorExecution { .. }) => 3,
                Some(AppError::SecurityCheck { .. }) => 4,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Bundle(args) => {
                log::debug!("Executing 'bundle' command...");
                commands::bundle::handle_bundle_command(args, quiet)?;
            }
            Commands::Resolve(args) => {
                log::debug!("Executing 'resolve' command...");
                commands::resolve::handle_resolve_command(args)?;
            }
            Commands::Presets(args) => {
                log::debug!("Executing 'presets' command...");
                commands::presets::handle_presets_command(args)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args)?;
            }
        },
    }
    Ok(())
}

/// Resolve the project root from the CLI argument or the current directory,
/// with tilde expansion, and canonicalize it.
pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
    let path_to_resolve = match cli_project_root {
        Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    path_to_resolve.canonicalize().with_context(|| {
        format!(
            "Failed to canonicalize project root '{}'",
            path_to_resolve.display()
        )
    })
}

/// The ordered preset document list: explicit `--preset` arguments verbatim,
/// otherwise the default document at the project root when it exists.
pub fn resolve_preset_paths(project_root: &Path, opts: &ProjectOpts) -> Result<Vec<PathBuf>> {
    if !opts.presets.is_empty() {
        let mut paths = Vec::with_capacity(opts.presets.len());
        for raw in &opts.presets {
            let expanded = PathBuf::from(shellexpand::tilde(&raw.to_string_lossy()).as_ref());
            if !expanded.exists() {
                anyhow::bail!(
                    "Specified preset document not found at path: {}",
                    expanded.display()
                );
            }
            paths.push(expanded);
        }
        return Ok(paths);
    }

    if opts.no_default_presets {
        log::debug!("Default preset document disabled via CLI flag.");
        return Ok(Vec::new());
    }

    let default_path = project_root.join(DEFAULT_PRESET_FILENAME);
    if default_path.exists() {
        log::debug!("Using default preset document: {}", default_path.display());
        Ok(vec![default_path])
    } else {
        log::debug!(
            "No preset document specified and default not found at: {}",
            default_path.display()
        );
        Ok(Vec::new())
    }
}
