use crate::error::{AppError, Result};
use crate::gather::FileEntry;
use crate::pipeline::{Pipeline, SecretScanner};
use crate::processors::ProcessorRegistry;
use crate::resolver::{ResolutionTrace, Resolver};
use crate::settings::{SecurityCheckMode, Settings, SettingsPatch};
use byte_unit::Byte;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Abort the whole run on the first per-file failure instead of
    /// skipping the file with a warning.
    pub strict: bool,
}

/// A file that made it through resolution and the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFile {
    pub entry: FileEntry,
    pub settings: Settings,
    pub content: String,
    pub trace: ResolutionTrace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Hidden,
    Binary,
    NonUtf8,
    TooLarge { limit: Byte },
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub entry: FileEntry,
    pub skip: SkipReason,
}

#[derive(Debug, Default, Serialize)]
pub struct EngineReport {
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Per-file failures collected in non-strict mode.
    pub failures: Vec<String>,
}

enum Outcome {
    Processed(Box<ProcessedFile>),
    Skipped(SkippedFile),
    Failed(AppError),
}

/// Resolve, gate, scan and transform every file. Files are independent, so
/// they run in parallel; the configuration behind `resolver` is read-only
/// and shared. One file's failure cannot affect any other file's output.
pub fn process_files(
    project_root: &Path,
    files: Vec<FileEntry>,
    resolver: &Resolver<'_>,
    cli_overrides: &SettingsPatch,
    registry: &ProcessorRegistry,
    scanner: &dyn SecretScanner,
    options: &EngineOptions,
) -> Result<EngineReport> {
    let pipeline = Pipeline::new(registry);
    log::info!("Processing {} file(s)...", files.len());

    let outcomes: Vec<Outcome> = files
        .into_par_iter()
        .map(|entry| process_one(project_root, entry, resolver, cli_overrides, &pipeline, scanner))
        .collect();

    let mut report = EngineReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Processed(file) => report.processed.push(*file),
            Outcome::Skipped(skipped) => {
                log::debug!(
                    "Skipped '{}': {:?}",
                    skipped.entry.path.display(),
                    skipped.skip
                );
                report.skipped.push(skipped);
            }
            Outcome::Failed(err) => {
                if options.strict {
                    return Err(err);
                }
                log::warn!("Skipping file after failure: {}", err);
                report.failures.push(err.to_string());
            }
        }
    }

    report.processed.sort_by(|a, b| a.entry.path.cmp(&b.entry.path));
    report.skipped.sort_by(|a, b| a.entry.path.cmp(&b.entry.path));
    log::info!(
        "Pipeline complete: {} bundled, {} skipped, {} failed.",
        report.processed.len(),
        report.skipped.len(),
        report.failures.len()
    );
    Ok(report)
}

fn process_one(
    project_root: &Path,
    entry: FileEntry,
    resolver: &Resolver<'_>,
    cli_overrides: &SettingsPatch,
    pipeline: &Pipeline<'_>,
    scanner: &dyn SecretScanner,
) -> Outcome {
    let (settings, trace) = resolver.resolve(&entry, cli_overrides);

    if entry.is_hidden && !settings.include_hidden {
        return Outcome::Skipped(SkippedFile {
            entry,
            skip: SkipReason::Hidden,
        });
    }
    if entry.is_binary && !settings.include_binary {
        return Outcome::Skipped(SkippedFile {
            entry,
            skip: SkipReason::Binary,
        });
    }
    if let Some(limit) = settings.max_file_size {
        if entry.size_bytes > limit.as_u64() {
            return Outcome::Skipped(SkippedFile {
                entry,
                skip: SkipReason::TooLarge { limit },
            });
        }
    }

    let absolute = project_root.join(&entry.path);
    let bytes = match fs::read(&absolute) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Outcome::Failed(AppError::FileRead {
                path: entry.path.clone(),
                source: e,
            });
        }
    };
    let raw = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => {
            return Outcome::Skipped(SkippedFile {
                entry,
                skip: SkipReason::NonUtf8,
            });
        }
    };

    if settings.security_check != SecurityCheckMode::Skip {
        let findings = scanner.scan(&entry, &raw);
        if !findings.is_empty() {
            match settings.security_check {
                SecurityCheckMode::Error => {
                    return Outcome::Failed(AppError::SecurityCheck {
                        path: entry.path.clone(),
                        findings: findings.len(),
                    });
                }
                SecurityCheckMode::Warn => {
                    for finding in &findings {
                        log::warn!(
                            "Possible secret in '{}' line {}",
                            entry.path.display(),
                            finding.line
                        );
                    }
                }
                SecurityCheckMode::Skip => {}
            }
        }
    }

    match pipeline.run(&entry, &raw, &settings) {
        Ok(content) => Outcome::Processed(Box::new(ProcessedFile {
            entry,
            settings,
            content,
            trace,
        })),
        Err(err) => Outcome::Failed(err),
    }
}
