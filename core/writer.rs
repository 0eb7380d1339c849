use crate::engine::ProcessedFile;
use crate::error::{AppError, Result};
use crate::settings::{LineEnding, SeparatorStyle};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Assemble the final artifact. Each file brings its own effective settings,
/// so separator style, metadata lines and line endings can differ per file.
pub fn assemble(files: &[ProcessedFile]) -> String {
    let mut out = String::new();
    for file in files {
        let path = file.entry.path.to_string_lossy();
        let block = render_block(&path, file);
        out.push_str(&apply_line_ending(&block, file.settings.line_ending));
    }
    out
}

fn render_block(path: &str, file: &ProcessedFile) -> String {
    let settings = &file.settings;
    let mut block = String::new();
    match settings.separator_style {
        SeparatorStyle::Standard => {
            block.push_str(&format!("======= {} =======\n", path));
        }
        SeparatorStyle::Detailed => {
            block.push_str(&"=".repeat(70));
            block.push('\n');
            block.push_str(&format!("== FILE: {}\n", path));
            if settings.include_metadata {
                let kind = if file.entry.extension.is_empty() {
                    "(none)"
                } else {
                    file.entry.extension.as_str()
                };
                block.push_str(&format!(
                    "== SIZE: {} bytes | TYPE: {}\n",
                    file.entry.size_bytes, kind
                ));
            }
            block.push_str(&"=".repeat(70));
            block.push('\n');
        }
        SeparatorStyle::Markdown => {
            let lang = file.entry.extension.trim_start_matches('.');
            block.push_str(&format!("## {}\n\n```{}\n", path, lang));
        }
        SeparatorStyle::Machine => {
            block.push_str(&format!("--- FILE: {} ---\n", path));
        }
        SeparatorStyle::None => {}
    }

    block.push_str(&file.content);
    if !file.content.ends_with('\n') && !file.content.is_empty() {
        block.push('\n');
    }
    if settings.separator_style == SeparatorStyle::Markdown {
        block.push_str("```\n");
    }
    block.push('\n');
    block
}

fn apply_line_ending(text: &str, ending: LineEnding) -> String {
    match ending {
        LineEnding::Preserve => text.to_string(),
        LineEnding::Lf => text.replace("\r\n", "\n"),
        LineEnding::Crlf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
    }
}

pub fn write_output(content: &str, target: Option<&Path>) -> Result<()> {
    match target {
        Some(path) => {
            log::info!("Writing bundle to: {}", path.display());
            fs::write(path, content).map_err(|e| AppError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            })
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .map_err(AppError::Io)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gather::FileEntry;
    use crate::resolver::{ResolutionTrace, TraceLayer};
    use crate::settings::{Settings, SettingsPatch};

    fn processed(path: &str, content: &str, patch: SettingsPatch) -> ProcessedFile {
        let mut settings = Settings::default();
        patch.apply_to(&mut settings);
        ProcessedFile {
            entry: FileEntry::new(path, content.len() as u64),
            settings,
            content: content.to_string(),
            trace: ResolutionTrace {
                path: path.into(),
                layers: vec![TraceLayer::BuiltinDefaults],
            },
        }
    }

    #[test]
    fn standard_separator_names_the_file() {
        let files = vec![processed("src/a.rs", "fn a() {}\n", SettingsPatch::default())];
        let out = assemble(&files);
        assert!(out.starts_with("======= src/a.rs =======\n"));
        assert!(out.contains("fn a() {}\n"));
    }

    #[test]
    fn detailed_separator_metadata_is_toggleable() {
        let with = processed(
            "a.txt",
            "x\n",
            SettingsPatch {
                separator_style: Some(SeparatorStyle::Detailed),
                ..Default::default()
            },
        );
        let without = processed(
            "a.txt",
            "x\n",
            SettingsPatch {
                separator_style: Some(SeparatorStyle::Detailed),
                include_metadata: Some(false),
                ..Default::default()
            },
        );
        assert!(assemble(&[with]).contains("== SIZE:"));
        assert!(!assemble(&[without]).contains("== SIZE:"));
    }

    #[test]
    fn markdown_separator_fences_content() {
        let files = vec![processed(
            "src/lib.rs",
            "pub fn x() {}\n",
            SettingsPatch {
                separator_style: Some(SeparatorStyle::Markdown),
                ..Default::default()
            },
        )];
        let out = assemble(&files);
        assert!(out.contains("## src/lib.rs\n\n```rs\n"));
        assert!(out.contains("pub fn x() {}\n```\n"));
    }

    #[test]
    fn none_separator_concatenates_bare_content() {
        let files = vec![processed(
            "a.txt",
            "body\n",
            SettingsPatch {
                separator_style: Some(SeparatorStyle::None),
                ..Default::default()
            },
        )];
        assert_eq!(assemble(&files), "body\n\n");
    }

    #[test]
    fn crlf_line_ending_is_applied() {
        let files = vec![processed(
            "a.txt",
            "one\ntwo\n",
            SettingsPatch {
                separator_style: Some(SeparatorStyle::None),
                line_ending: Some(LineEnding::Crlf),
                ..Default::default()
            },
        )];
        assert_eq!(assemble(&files), "one\r\ntwo\r\n\r\n");
    }
}
