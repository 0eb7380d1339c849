use crate::settings::ProcessorArgs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Appended when content is cut by `truncate` or the `max_lines` post-step.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// A custom processor: content in, content out. Errors are plain messages;
/// the pipeline wraps them with the file path and processor name.
pub type ProcessorFn =
    Box<dyn Fn(&str, &ProcessorArgs) -> Result<String, String> + Send + Sync>;

/// Name -> transform registry, populated at startup. Lookup happens lazily at
/// pipeline time, so an unknown name only fails the files that use it.
pub struct ProcessorRegistry {
    entries: HashMap<String, ProcessorFn>,
}

impl ProcessorRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the built-in processors: `truncate`, `redact_secrets`
    /// and `extract_functions`.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("truncate", Box::new(truncate));
        registry.register("redact_secrets", Box::new(redact_secrets));
        registry.register("extract_functions", Box::new(extract_functions));
        registry
    }

    pub fn register(&mut self, name: &str, processor: ProcessorFn) {
        log::debug!("Registering custom processor '{}'", name);
        self.entries.insert(name.to_string(), processor);
    }

    pub fn get(&self, name: &str) -> Option<&ProcessorFn> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Cut content at `max_chars` or `max_lines` (at least one is required) and
/// append the truncation marker unless `add_marker: false`.
fn truncate(content: &str, args: &ProcessorArgs) -> Result<String, String> {
    let max_chars = args.get_usize("max_chars");
    let max_lines = args.get_usize("max_lines");
    if max_chars.is_none() && max_lines.is_none() {
        return Err("truncate requires a max_chars or max_lines argument".to_string());
    }
    let add_marker = args.get_bool("add_marker").unwrap_or(true);

    let mut text = content.to_string();
    let mut cut = false;
    if let Some(limit) = max_lines {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() > limit {
            text = lines[..limit].join("\n");
            cut = true;
        }
    }
    if let Some(limit) = max_chars {
        if text.chars().count() > limit {
            text = text.chars().take(limit).collect();
            cut = true;
        }
    }
    if cut && add_marker {
        text.push('\n');
        text.push_str(TRUNCATION_MARKER);
    }
    Ok(text)
}

static DEFAULT_SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*['"]?[A-Za-z0-9_\-]{8,}['"]?"#,
        r#"(?i)(secret[_-]?key|client[_-]?secret|secret)\s*[:=]\s*['"]?[A-Za-z0-9_\-]{8,}['"]?"#,
        r#"(?i)(password|passwd|pwd)\s*[:=]\s*['"]?[^\s'"]{6,}['"]?"#,
        r#"(?i)(auth[_-]?token|access[_-]?token|token)\s*[:=]\s*['"]?[A-Za-z0-9_\-.]{8,}['"]?"#,
        r#"(?i)bearer\s+[A-Za-z0-9_\-.=]{16,}"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("builtin secret pattern must compile"))
    .collect()
});

pub(crate) fn default_secret_patterns() -> &'static [Regex] {
    &DEFAULT_SECRET_PATTERNS
}

/// Replace secret-shaped substrings. `patterns` overrides the default set;
/// `replacement` defaults to `[REDACTED]`.
fn redact_secrets(content: &str, args: &ProcessorArgs) -> Result<String, String> {
    let replacement = args.get_str("replacement").unwrap_or("[REDACTED]");

    let custom: Option<Vec<Regex>> = match args.get_str_list("patterns") {
        Some(patterns) => {
            let mut compiled = Vec::with_capacity(patterns.len());
            for pattern in &patterns {
                let regex = Regex::new(pattern)
                    .map_err(|e| format!("invalid redaction pattern \"{}\": {}", pattern, e))?;
                compiled.push(regex);
            }
            Some(compiled)
        }
        None => None,
    };

    let mut text = content.to_string();
    let patterns: &[Regex] = match custom.as_deref() {
        Some(p) => p,
        None => default_secret_patterns(),
    };
    for regex in patterns {
        text = regex.replace_all(&text, replacement).into_owned();
    }
    Ok(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FnLanguage {
    Rust,
    Python,
    JavaScript,
}

impl FnLanguage {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "rust" | "rs" => Some(FnLanguage::Rust),
            "python" | "py" => Some(FnLanguage::Python),
            "javascript" | "js" | "typescript" | "ts" => Some(FnLanguage::JavaScript),
            _ => None,
        }
    }
}

/// Emit only function signatures, discarding bodies. Line-based heuristic
/// covering Rust, Python and JavaScript; `include_docstrings: true` keeps
/// the documentation attached to each signature.
fn extract_functions(content: &str, args: &ProcessorArgs) -> Result<String, String> {
    let languages: Vec<FnLanguage> = match args.get_str_list("languages") {
        Some(names) => {
            let mut langs = Vec::new();
            for name in &names {
                match FnLanguage::from_name(name) {
                    Some(lang) => langs.push(lang),
                    None => return Err(format!("unsupported language \"{}\"", name)),
                }
            }
            langs
        }
        None => vec![FnLanguage::Rust, FnLanguage::Python, FnLanguage::JavaScript],
    };
    let include_docstrings = args.get_bool("include_docstrings").unwrap_or(false);

    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let matched = languages.iter().any(|lang| match lang {
            FnLanguage::Rust => {
                trimmed.starts_with("fn ")
                    || trimmed.starts_with("pub fn ")
                    || trimmed.starts_with("pub(crate) fn ")
                    || trimmed.starts_with("async fn ")
                    || trimmed.starts_with("pub async fn ")
            }
            FnLanguage::Python => {
                trimmed.starts_with("def ") || trimmed.starts_with("async def ")
            }
            FnLanguage::JavaScript => {
                trimmed.starts_with("function ")
                    || trimmed.starts_with("async function ")
                    || trimmed.starts_with("export function ")
                    || trimmed.starts_with("export async function ")
            }
        });
        if !matched {
            continue;
        }

        if include_docstrings {
            // Rust and JS document above the signature.
            let mut doc_start = idx;
            while doc_start > 0 {
                let above = lines[doc_start - 1].trim_start();
                if above.starts_with("///") || above.starts_with("//!") || above.starts_with('*')
                    || above.starts_with("/**")
                {
                    doc_start -= 1;
                } else {
                    break;
                }
            }
            for doc_line in &lines[doc_start..idx] {
                out.push(doc_line.to_string());
            }
        }

        let signature = line
            .split_once('{')
            .map(|(head, _)| head.trim_end())
            .unwrap_or(line.trim_end());
        out.push(signature.to_string());

        if include_docstrings {
            // Python documents below, as the first statement.
            if let Some(next) = lines.get(idx + 1) {
                let next_trimmed = next.trim_start();
                if next_trimmed.starts_with("\"\"\"") || next_trimmed.starts_with("'''") {
                    let quote = &next_trimmed[..3];
                    out.push(next.to_string());
                    if !(next_trimmed.len() > 3 && next_trimmed[3..].contains(quote)) {
                        for follow in &lines[idx + 2..] {
                            out.push(follow.to_string());
                            if follow.contains(quote) {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn args(pairs: &[(&str, serde_yml::Value)]) -> ProcessorArgs {
        let map: IndexMap<String, serde_yml::Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ProcessorArgs(map)
    }

    #[test]
    fn truncate_cuts_at_max_chars() {
        let a = args(&[("max_chars", 10.into())]);
        let out = truncate("0123456789ABCDEF", &a).unwrap();
        assert!(out.starts_with("0123456789"));
        assert!(!out.contains('A'));
        assert!(out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn truncate_without_marker() {
        let a = args(&[("max_chars", 4.into()), ("add_marker", false.into())]);
        assert_eq!(truncate("abcdef", &a).unwrap(), "abcd");
    }

    #[test]
    fn truncate_cuts_at_max_lines() {
        let a = args(&[("max_lines", 2.into()), ("add_marker", false.into())]);
        assert_eq!(truncate("a\nb\nc\nd\n", &a).unwrap(), "a\nb");
    }

    #[test]
    fn truncate_requires_a_limit() {
        assert!(truncate("abc", &args(&[])).is_err());
    }

    #[test]
    fn short_content_is_untouched() {
        let a = args(&[("max_chars", 100.into())]);
        assert_eq!(truncate("short", &a).unwrap(), "short");
    }

    #[test]
    fn redacts_default_secret_shapes() {
        let input = "api_key = \"sk_live_abcdef123456\"\npassword: hunter2pass\n";
        let out = redact_secrets(input, &args(&[])).unwrap();
        assert!(!out.contains("sk_live_abcdef123456"));
        assert!(!out.contains("hunter2pass"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn redacts_with_custom_patterns_and_replacement() {
        let a = args(&[
            ("patterns", serde_yml::Value::Sequence(vec!["cat".into()])),
            ("replacement", "dog".into()),
        ]);
        assert_eq!(
            redact_secrets("the cat sat", &a).unwrap(),
            "the dog sat"
        );
    }

    #[test]
    fn invalid_custom_pattern_is_an_error() {
        let a = args(&[(
            "patterns",
            serde_yml::Value::Sequence(vec!["(unclosed".into()]),
        )]);
        assert!(redact_secrets("x", &a).is_err());
    }

    #[test]
    fn extracts_signatures_without_bodies() {
        let input = "fn alpha(x: u8) -> u8 {\n    x + 1\n}\n\npub fn beta() {\n    work();\n}\n";
        let out = extract_functions(input, &args(&[])).unwrap();
        assert_eq!(out, "fn alpha(x: u8) -> u8\npub fn beta()");
    }

    #[test]
    fn extracts_python_docstrings_when_asked() {
        let input = "def f(x):\n    \"\"\"Doubles x.\"\"\"\n    return x * 2\n";
        let a = args(&[
            ("languages", serde_yml::Value::Sequence(vec!["python".into()])),
            ("include_docstrings", true.into()),
        ]);
        let out = extract_functions(input, &a).unwrap();
        assert!(out.contains("def f(x):"));
        assert!(out.contains("Doubles x."));
        assert!(!out.contains("return"));
    }

    #[test]
    fn unknown_language_is_an_error() {
        let a = args(&[(
            "languages",
            serde_yml::Value::Sequence(vec!["cobol".into()]),
        )]);
        assert!(extract_functions("x", &a).is_err());
    }

    #[test]
    fn registry_lookup_and_names() {
        let registry = ProcessorRegistry::builtin();
        assert!(registry.get("truncate").is_some());
        assert!(registry.get("nope").is_none());
        assert_eq!(
            registry.names(),
            vec!["extract_functions", "redact_secrets", "truncate"]
        );
    }

    #[test]
    fn custom_registration_is_dispatchable() {
        let mut registry = ProcessorRegistry::builtin();
        registry.register(
            "shout",
            Box::new(|content, _| Ok(content.to_uppercase())),
        );
        let f = registry.get("shout").unwrap();
        assert_eq!(f("hi", &ProcessorArgs::default()).unwrap(), "HI");
    }
}
