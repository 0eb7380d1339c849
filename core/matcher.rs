use crate::error::{AppError, Result};
use crate::presets::Rule;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::Path;

/// Normalize a file extension to lowercase with exactly one leading dot.
/// Idempotent: `"py"`, `".py"` and `".PY"` all come out as `".py"`. An empty
/// input stays empty (files without an extension never match an extension
/// constraint).
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }
    format!(".{}", trimmed.to_lowercase())
}

/// Which axis of a rule's match specification was satisfied. Carried into the
/// resolution trace so `monofile resolve` can say why a rule won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAxis {
    Extension,
    Pattern,
    Both,
}

/// A rule's match specification, compiled once at resolver construction.
/// Patterns are prefixed with the owning group's `base_path` before glob
/// compilation, so matching itself is a flat globset lookup.
#[derive(Debug)]
pub struct RuleMatcher {
    extensions: Vec<String>,
    patterns: GlobSet,
    has_patterns: bool,
}

impl RuleMatcher {
    pub fn compile(rule: &Rule, base_path: Option<&Path>, scope: &str) -> Result<Self> {
        let extensions: Vec<String> = rule
            .extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();

        let mut builder = GlobSetBuilder::new();
        for pattern in &rule.patterns {
            let full = match base_path {
                Some(base) => format!(
                    "{}/{}",
                    base.to_string_lossy().trim_end_matches('/'),
                    pattern
                ),
                None => pattern.clone(),
            };
            log::trace!("Compiling pattern for {}: {}", scope, full);
            let glob = GlobBuilder::new(&full)
                .literal_separator(true)
                .build()
                .map_err(|e| AppError::Glob {
                    scope: scope.to_string(),
                    message: format!("invalid pattern \"{}\": {}", pattern, e),
                })?;
            builder.add(glob);
        }
        let patterns = builder.build().map_err(|e| AppError::Glob {
            scope: scope.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            extensions,
            patterns,
            has_patterns: !rule.patterns.is_empty(),
        })
    }

    /// True when this rule constrains neither axis. Such a rule matches
    /// nothing here; only the resolver's `default`-rule fallback can apply it.
    pub fn is_unconstrained(&self) -> bool {
        self.extensions.is_empty() && !self.has_patterns
    }

    /// An absent axis imposes no constraint but cannot produce a match on its
    /// own; when both axes are present the file must satisfy the extension
    /// check AND at least one pattern.
    pub fn matches(&self, path: &Path, extension: &str) -> Option<MatchAxis> {
        let ext_constrained = !self.extensions.is_empty();
        if !ext_constrained && !self.has_patterns {
            return None;
        }

        let normalized = normalize_extension(extension);
        let ext_ok = !ext_constrained || self.extensions.iter().any(|e| *e == normalized);
        let pattern_ok = !self.has_patterns || self.patterns.is_match(path);
        if !(ext_ok && pattern_ok) {
            return None;
        }

        Some(match (ext_constrained, self.has_patterns) {
            (true, true) => MatchAxis::Both,
            (true, false) => MatchAxis::Extension,
            _ => MatchAxis::Pattern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rule(extensions: &[&str], patterns: &[&str]) -> Rule {
        Rule {
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn compile(rule: &Rule, base: Option<&str>) -> RuleMatcher {
        RuleMatcher::compile(rule, base.map(Path::new), "test").unwrap()
    }

    #[test]
    fn extension_normalization_is_idempotent() {
        assert_eq!(normalize_extension("py"), ".py");
        assert_eq!(normalize_extension(".py"), ".py");
        assert_eq!(normalize_extension(".PY"), ".py");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn bare_and_dotted_extensions_match_identically() {
        let file = PathBuf::from("x.py");
        let bare = compile(&rule(&["py"], &[]), None);
        let dotted = compile(&rule(&[".py"], &[]), None);
        assert_eq!(
            bare.matches(&file, ".py").is_some(),
            dotted.matches(&file, ".py").is_some()
        );
        assert_eq!(bare.matches(&file, ".py"), Some(MatchAxis::Extension));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let m = compile(&rule(&[".Rs"], &[]), None);
        assert!(m.matches(Path::new("lib.rs"), ".RS").is_some());
    }

    #[test]
    fn patterns_are_or_combined() {
        let m = compile(&rule(&[], &["src/**/*.rs", "build.rs"]), None);
        assert_eq!(
            m.matches(Path::new("src/deep/mod.rs"), ".rs"),
            Some(MatchAxis::Pattern)
        );
        assert_eq!(
            m.matches(Path::new("build.rs"), ".rs"),
            Some(MatchAxis::Pattern)
        );
        assert!(m.matches(Path::new("docs/readme.md"), ".md").is_none());
    }

    #[test]
    fn axes_are_and_combined() {
        let m = compile(&rule(&[".js"], &["vendor/**"]), None);
        assert_eq!(
            m.matches(Path::new("vendor/lib.js"), ".js"),
            Some(MatchAxis::Both)
        );
        // Right extension, wrong location.
        assert!(m.matches(Path::new("src/app.js"), ".js").is_none());
        // Right location, wrong extension.
        assert!(m.matches(Path::new("vendor/style.css"), ".css").is_none());
    }

    #[test]
    fn star_does_not_cross_segments() {
        let m = compile(&rule(&[], &["src/*.rs"]), None);
        assert!(m.matches(Path::new("src/main.rs"), ".rs").is_some());
        assert!(m.matches(Path::new("src/sub/main.rs"), ".rs").is_none());

        let deep = compile(&rule(&[], &["src/**/*.rs"]), None);
        assert!(deep.matches(Path::new("src/sub/main.rs"), ".rs").is_some());
    }

    #[test]
    fn base_path_prefixes_patterns() {
        let m = compile(&rule(&[], &["*.html"]), Some("web/templates"));
        assert!(
            m.matches(Path::new("web/templates/index.html"), ".html")
                .is_some()
        );
        assert!(m.matches(Path::new("index.html"), ".html").is_none());
    }

    #[test]
    fn unconstrained_rule_matches_nothing() {
        let m = compile(&rule(&[], &[]), None);
        assert!(m.is_unconstrained());
        assert!(m.matches(Path::new("anything.txt"), ".txt").is_none());
    }
}
