use crate::error::{AppError, Result};
use crate::matcher::normalize_extension;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// One candidate file, as handed to the resolution engine. The engine never
/// re-derives any of these fields from the filesystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Normalized extension (leading dot, lowercase); empty when the file
    /// has none.
    pub extension: String,
    pub size_bytes: u64,
    pub is_hidden: bool,
    pub is_binary: bool,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        // Dotfiles like `.env` have no extension as far as std is concerned,
        // but per-extension settings must still reach them, so the whole
        // name serves as the extension.
        let extension = match path.extension() {
            Some(e) => normalize_extension(&e.to_string_lossy()),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy())
                .filter(|n| n.starts_with('.'))
                .map(|n| normalize_extension(&n))
                .unwrap_or_default(),
        };
        let is_hidden = path.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        });
        Self {
            path,
            extension,
            size_bytes,
            is_hidden,
            is_binary: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatherOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub use_gitignore: bool,
}

/// Walk the project root and produce the flat, sorted file list the engine
/// consumes. Hidden, binary and oversized files are still listed; whether
/// they end up in the bundle is decided per file by the resolved settings.
pub fn gather_files(project_root: &Path, options: &GatherOptions) -> Result<Vec<FileEntry>> {
    log::debug!("Gathering files under: {}", project_root.display());
    let include_set = build_glob_set(&options.include)?;
    let exclude_set = build_glob_set(&options.exclude)?;
    let has_includes = !options.include.is_empty();

    let mut builder = WalkBuilder::new(project_root);
    builder.hidden(false);
    builder.ignore(options.use_gitignore);
    builder.git_ignore(options.use_gitignore);
    builder.git_exclude(options.use_gitignore);
    builder.require_git(false);
    log::debug!("Walker configured (gitignore: {})", options.use_gitignore);

    let mut entries = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Error walking directory: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(relative) = pathdiff::diff_paths(path, project_root) else {
            log::warn!("Could not get relative path for: {}", path.display());
            continue;
        };
        if relative.components().next() == Some(Component::Normal(".git".as_ref())) {
            continue;
        }
        if exclude_set.is_match(&relative) {
            log::trace!("Excluded by pattern: {}", relative.display());
            continue;
        }
        if has_includes && !include_set.is_match(&relative) {
            log::trace!("Not matched by include patterns: {}", relative.display());
            continue;
        }

        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let mut file_entry = FileEntry::new(relative, size_bytes);
        file_entry.is_binary = sniff_binary(path).unwrap_or(false);
        entries.push(file_entry);
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    log::info!("Gathered {} candidate file(s).", entries.len());
    Ok(entries)
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed = pattern_str.trim().to_string();
        if processed.ends_with('/') && processed.len() > 1 {
            processed.push_str("**");
        }
        let glob = Glob::new(&processed).map_err(|e| AppError::Glob {
            scope: "file filters".to_string(),
            message: format!("invalid pattern \"{}\": {}", pattern_str, e),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(AppError::from)
}

/// NUL byte in the first 8 KiB marks the file as binary.
fn sniff_binary(path: &Path) -> Result<bool> {
    let mut file = File::open(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut buf = [0u8; 8192];
    let read = file.read(&mut buf).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(buf[..read].contains(&0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn entry_derives_extension_and_hidden_flag() {
        let entry = FileEntry::new("src/.config/settings.JSON", 12);
        assert_eq!(entry.extension, ".json");
        assert!(entry.is_hidden);

        let plain = FileEntry::new("Makefile", 1);
        assert_eq!(plain.extension, "");
        assert!(!plain.is_hidden);
    }

    #[test]
    fn gather_lists_files_relative_and_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# hi\n").unwrap();
        fs::write(dir.path().join(".hidden"), "x\n").unwrap();

        let entries = gather_files(dir.path(), &GatherOptions::default()).unwrap();
        let paths: Vec<String> = entries
            .iter()
            .map(|e| e.path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, vec![".hidden", "README.md", "src/main.rs"]);
        assert!(entries[0].is_hidden);
    }

    #[test]
    fn gather_applies_include_and_exclude() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("src/notes.txt"), "").unwrap();
        fs::write(dir.path().join("top.rs"), "").unwrap();

        let options = GatherOptions {
            include: vec!["**/*.rs".into()],
            exclude: vec!["top.rs".into()],
            use_gitignore: false,
        };
        let entries = gather_files(dir.path(), &options).unwrap();
        let paths: Vec<String> = entries
            .iter()
            .map(|e| e.path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, vec!["src/lib.rs"]);
    }

    #[test]
    fn binary_files_are_flagged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blob.bin"), b"\x00\x01\x02text").unwrap();
        fs::write(dir.path().join("text.txt"), "plain\n").unwrap();

        let entries = gather_files(dir.path(), &GatherOptions::default()).unwrap();
        let by_name = |n: &str| entries.iter().find(|e| e.path.ends_with(n)).unwrap();
        assert!(by_name("blob.bin").is_binary);
        assert!(!by_name("text.txt").is_binary);
    }
}
