use crate::actions;
use crate::error::{AppError, Result};
use crate::gather::FileEntry;
use crate::processors::{ProcessorRegistry, TRUNCATION_MARKER, default_secret_patterns};
use crate::settings::{ActionKind, Settings};
use serde::Serialize;

/// One hit from the security scanner, enough for a user to locate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityFinding {
    pub line: usize,
    pub kind: String,
}

/// Pluggable secret scanner, consulted before any action runs. How findings
/// are handled is decided by the file's `security_check` mode, not by the
/// scanner.
pub trait SecretScanner: Send + Sync {
    fn scan(&self, file: &FileEntry, content: &str) -> Vec<SecurityFinding>;
}

/// Scanner that never reports anything.
pub struct NoopScanner;

impl SecretScanner for NoopScanner {
    fn scan(&self, _file: &FileEntry, _content: &str) -> Vec<SecurityFinding> {
        Vec::new()
    }
}

/// Scanner backed by the same pattern set the `redact_secrets` processor
/// uses by default.
pub struct RegexScanner;

impl SecretScanner for RegexScanner {
    fn scan(&self, _file: &FileEntry, content: &str) -> Vec<SecurityFinding> {
        let mut findings = Vec::new();
        for (line_idx, line) in content.lines().enumerate() {
            for regex in default_secret_patterns() {
                if regex.is_match(line) {
                    findings.push(SecurityFinding {
                        line: line_idx + 1,
                        kind: regex.as_str().chars().take(32).collect(),
                    });
                    break;
                }
            }
        }
        findings
    }
}

/// Executes a file's resolved action list in order. Stateless apart from the
/// registry reference; safe to share across worker threads.
pub struct Pipeline<'a> {
    registry: &'a ProcessorRegistry,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a ProcessorRegistry) -> Self {
        Self { registry }
    }

    /// Run the transform chain: the scraped-metadata pre-step when enabled,
    /// then every action in list order, then the `max_lines` cut, which
    /// applies regardless of which actions ran. Failures surface as errors;
    /// content is never silently passed through untransformed.
    pub fn run(&self, file: &FileEntry, content: &str, settings: &Settings) -> Result<String> {
        let mut text = if settings.remove_scraped_metadata {
            actions::remove_scraped_metadata(content)
        } else {
            content.to_string()
        };

        for action in &settings.actions {
            log::trace!("Applying {:?} to {}", action, file.path.display());
            text = match action {
                ActionKind::Minify => actions::minify(&text, &file.extension),
                ActionKind::StripTags => {
                    actions::strip_tags(&text, &settings.strip_tags, &settings.preserve_tags)
                }
                ActionKind::StripComments => actions::strip_comments(&text, &file.extension),
                ActionKind::CompressWhitespace => actions::compress_whitespace(&text),
                ActionKind::RemoveEmptyLines => actions::remove_empty_lines(&text),
                ActionKind::JoinParagraphs => actions::join_paragraphs(&text),
                ActionKind::Custom => self.run_custom(file, &text, settings)?,
            };
        }

        if let Some(limit) = settings.max_lines {
            text = truncate_lines(&text, limit);
        }
        Ok(text)
    }

    fn run_custom(&self, file: &FileEntry, content: &str, settings: &Settings) -> Result<String> {
        let name = settings.custom_processor.as_deref().ok_or_else(|| {
            AppError::UnknownProcessor {
                path: file.path.clone(),
                name: "(not set)".to_string(),
            }
        })?;
        let processor =
            self.registry
                .get(name)
                .ok_or_else(|| AppError::UnknownProcessor {
                    path: file.path.clone(),
                    name: name.to_string(),
                })?;
        processor(content, &settings.processor_args).map_err(|message| {
            AppError::ProcessorExecution {
                path: file.path.clone(),
                name: name.to_string(),
                message,
            }
        })
    }
}

/// Keep the first `limit` lines and append the truncation marker.
fn truncate_lines(content: &str, limit: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= limit {
        return content.to_string();
    }
    let mut out = lines[..limit].join("\n");
    out.push('\n');
    out.push_str(TRUNCATION_MARKER);
    out
}
