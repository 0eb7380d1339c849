//! Built-in content transforms. Every function is a pure text -> text
//! mapping; file-type awareness comes in through the extension argument.

/// Assembles output line by line so that lines left empty by comment removal
/// can be dropped while untouched lines pass through byte for byte.
struct LineWriter {
    out: String,
    line: String,
    line_had_comment: bool,
}

impl LineWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            line: String::new(),
            line_had_comment: false,
        }
    }

    fn push(&mut self, c: char) {
        if c == '\n' {
            self.flush_line(true);
        } else {
            self.line.push(c);
        }
    }

    fn note_comment(&mut self) {
        self.line_had_comment = true;
    }

    fn flush_line(&mut self, newline: bool) {
        let drop_line = self.line_had_comment && self.line.trim().is_empty();
        if !drop_line {
            if self.line_had_comment {
                self.out.push_str(self.line.trim_end());
            } else {
                self.out.push_str(&self.line);
            }
            if newline {
                self.out.push('\n');
            }
        }
        self.line.clear();
        self.line_had_comment = false;
    }

    fn finish(mut self) -> String {
        self.flush_line(false);
        self.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentFamily {
    CLike,
    Hash { triple_quotes: bool },
    Markup,
    Css,
    Sql,
}

fn comment_family(extension: &str) -> Option<CommentFamily> {
    match extension {
        ".c" | ".h" | ".cpp" | ".hpp" | ".cc" | ".cxx" | ".java" | ".cs" | ".go" | ".rs"
        | ".js" | ".jsx" | ".ts" | ".tsx" | ".mjs" | ".swift" | ".kt" | ".kts" | ".scala"
        | ".php" | ".dart" | ".zig" => Some(CommentFamily::CLike),
        ".py" | ".pyi" => Some(CommentFamily::Hash {
            triple_quotes: true,
        }),
        ".rb" | ".sh" | ".bash" | ".zsh" | ".fish" | ".pl" | ".pm" | ".r" | ".jl" | ".yaml"
        | ".yml" | ".toml" | ".mk" | ".cmake" | ".tf" | ".nix" => Some(CommentFamily::Hash {
            triple_quotes: false,
        }),
        ".html" | ".htm" | ".xml" | ".svg" | ".vue" | ".xhtml" => Some(CommentFamily::Markup),
        ".css" | ".scss" | ".less" => Some(CommentFamily::Css),
        ".sql" => Some(CommentFamily::Sql),
        _ => None,
    }
}

/// Remove language-appropriate comments. Strings and docstrings that merely
/// contain a comment marker are left alone; lines that held nothing but a
/// comment disappear entirely. Unknown file types pass through unchanged.
pub fn strip_comments(content: &str, extension: &str) -> String {
    match comment_family(extension) {
        Some(CommentFamily::CLike) => strip_clike(content, &['"', '\'', '`']),
        Some(CommentFamily::Hash { triple_quotes }) => strip_hash(content, triple_quotes),
        Some(CommentFamily::Markup) => strip_markup_comments(content),
        Some(CommentFamily::Css) => strip_block_only(content, &['"', '\'']),
        Some(CommentFamily::Sql) => strip_sql(content),
        None => content.to_string(),
    }
}

fn strip_clike(content: &str, quotes: &[char]) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut w = LineWriter::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if quotes.contains(&c) {
            // Copy the whole string literal verbatim.
            let end = string_end(&chars, i);
            for &sc in &chars[i..end] {
                w.push(sc);
            }
            i = end;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            w.note_comment();
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            w.note_comment();
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                if chars[i] == '\n' {
                    w.note_comment();
                    w.push('\n');
                } else {
                    w.note_comment();
                }
                i += 1;
            }
        } else {
            w.push(c);
            i += 1;
        }
    }
    w.finish()
}

fn strip_hash(content: &str, triple_quotes: bool) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut w = LineWriter::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if triple_quotes
            && (c == '"' || c == '\'')
            && chars.get(i + 1) == Some(&c)
            && chars.get(i + 2) == Some(&c)
        {
            let end = triple_string_end(&chars, i, c);
            for &sc in &chars[i..end] {
                w.push(sc);
            }
            i = end;
        } else if c == '"' || c == '\'' {
            let end = string_end(&chars, i);
            for &sc in &chars[i..end] {
                w.push(sc);
            }
            i = end;
        } else if c == '#' {
            w.note_comment();
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else {
            w.push(c);
            i += 1;
        }
    }
    w.finish()
}

fn strip_markup_comments(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut w = LineWriter::new();
    let mut i = 0;
    while i < chars.len() {
        if starts_with_at(&chars, i, "<!--") {
            i += 4;
            w.note_comment();
            while i < chars.len() {
                if starts_with_at(&chars, i, "-->") {
                    i += 3;
                    break;
                }
                if chars[i] == '\n' {
                    w.note_comment();
                    w.push('\n');
                } else {
                    w.note_comment();
                }
                i += 1;
            }
        } else {
            w.push(chars[i]);
            i += 1;
        }
    }
    w.finish()
}

fn strip_block_only(content: &str, quotes: &[char]) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut w = LineWriter::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if quotes.contains(&c) {
            let end = string_end(&chars, i);
            for &sc in &chars[i..end] {
                w.push(sc);
            }
            i = end;
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            w.note_comment();
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                if chars[i] == '\n' {
                    w.note_comment();
                    w.push('\n');
                } else {
                    w.note_comment();
                }
                i += 1;
            }
        } else {
            w.push(c);
            i += 1;
        }
    }
    w.finish()
}

fn strip_sql(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut w = LineWriter::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            let end = string_end(&chars, i);
            for &sc in &chars[i..end] {
                w.push(sc);
            }
            i = end;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            w.note_comment();
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            w.note_comment();
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                if chars[i] == '\n' {
                    w.note_comment();
                    w.push('\n');
                } else {
                    w.note_comment();
                }
                i += 1;
            }
        } else {
            w.push(c);
            i += 1;
        }
    }
    w.finish()
}

/// Index one past the end of the string literal starting at `start`.
/// Unterminated single-line strings end at the newline; backtick strings may
/// span lines.
fn string_end(chars: &[char], start: usize) -> usize {
    let delim = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == delim {
            return i + 1;
        }
        if c == '\n' && delim != '`' {
            return i;
        }
        i += 1;
    }
    chars.len()
}

fn triple_string_end(chars: &[char], start: usize, delim: char) -> usize {
    let mut i = start + 3;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == delim
            && chars.get(i + 1) == Some(&delim)
            && chars.get(i + 2) == Some(&delim)
        {
            return i + 3;
        }
        i += 1;
    }
    chars.len()
}

fn starts_with_at(chars: &[char], i: usize, needle: &str) -> bool {
    needle
        .chars()
        .enumerate()
        .all(|(offset, nc)| chars.get(i + offset) == Some(&nc))
}

/// Strip insignificant whitespace. Markup, code and plain text get different
/// rules, but string literals are never altered and no transformation here
/// changes executable semantics.
pub fn minify(content: &str, extension: &str) -> String {
    match extension {
        ".html" | ".htm" | ".xml" | ".svg" | ".vue" | ".xhtml" => minify_markup(content),
        ".js" | ".jsx" | ".ts" | ".tsx" | ".mjs" | ".json" => {
            minify_code(content, &['"', '\'', '`'])
        }
        ".css" | ".scss" | ".less" => minify_code(content, &['"', '\'']),
        _ => minify_plain(content),
    }
}

fn minify_code(content: &str, quotes: &[char]) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if quotes.contains(&c) {
            let end = string_end(&chars, i);
            out.extend(&chars[i..end]);
            i = end;
        } else if c.is_whitespace() {
            let mut has_newline = false;
            while i < chars.len() && chars[i].is_whitespace() {
                has_newline |= chars[i] == '\n';
                i += 1;
            }
            if out.is_empty() {
                continue;
            }
            if has_newline {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('\n');
            } else if !out.ends_with('\n') {
                out.push(' ');
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

fn minify_markup(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::new();
    let mut in_tag = false;
    let mut attr_quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = attr_quote {
            out.push(c);
            if c == q {
                attr_quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '<' => {
                in_tag = true;
                out.push(c);
                i += 1;
            }
            '>' => {
                in_tag = false;
                out.push(c);
                i += 1;
            }
            '"' | '\'' if in_tag => {
                attr_quote = Some(c);
                out.push(c);
                i += 1;
            }
            _ if c.is_whitespace() => {
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                let between_tags =
                    out.ends_with('>') && chars.get(i).copied() == Some('<');
                if out.is_empty() || i >= chars.len() || between_tags {
                    continue;
                }
                out.push(' ');
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn minify_plain(content: &str) -> String {
    let mut out_lines: Vec<&str> = Vec::new();
    let mut blank_pending = false;
    for line in content.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            blank_pending = !out_lines.is_empty();
        } else {
            if blank_pending {
                out_lines.push("");
                blank_pending = false;
            }
            out_lines.push(trimmed);
        }
    }
    let mut out = out_lines.join("\n");
    if content.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Remove markup tags while always keeping the text between them. An empty
/// `strip` list means "all tags"; names in `preserve` survive regardless.
/// Comment and doctype markup is only removed in strip-all mode.
pub fn strip_tags(content: &str, strip: &[String], preserve: &[String]) -> String {
    let strip_all = strip.is_empty();
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '<' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if starts_with_at(&chars, i, "<!--") {
            let close = find_at(&chars, i + 4, "-->");
            match close {
                Some(end) if strip_all => {
                    i = end + 3;
                }
                Some(end) => {
                    out.extend(&chars[i..end + 3]);
                    i = end + 3;
                }
                None => {
                    out.extend(&chars[i..]);
                    break;
                }
            }
            continue;
        }

        let mut j = i + 1;
        if chars.get(j) == Some(&'/') || chars.get(j) == Some(&'!') {
            j += 1;
        }
        let name_start = j;
        while j < chars.len()
            && (chars[j].is_ascii_alphanumeric() || chars[j] == '-' || chars[j] == ':')
        {
            j += 1;
        }
        if j == name_start {
            // A bare '<' (e.g. "a < b"), not markup.
            out.push('<');
            i += 1;
            continue;
        }
        let name: String = chars[name_start..j].iter().collect();

        let Some(close) = tag_end(&chars, j) else {
            out.extend(&chars[i..]);
            break;
        };

        let preserved = preserve.iter().any(|t| t.eq_ignore_ascii_case(&name));
        let stripped = strip_all || strip.iter().any(|t| t.eq_ignore_ascii_case(&name));
        if stripped && !preserved {
            i = close + 1;
        } else {
            out.extend(&chars[i..close + 1]);
            i = close + 1;
        }
    }
    out
}

fn tag_end(chars: &[char], mut i: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == '>' {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn find_at(chars: &[char], mut i: usize, needle: &str) -> Option<usize> {
    while i < chars.len() {
        if starts_with_at(chars, i, needle) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Collapse runs of horizontal whitespace to one space and runs of three or
/// more newlines to exactly two.
pub fn compress_whitespace(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            let mut newlines = 0;
            while i < chars.len() && chars[i].is_whitespace() {
                if chars[i] == '\n' {
                    newlines += 1;
                }
                i += 1;
            }
            match newlines {
                0 => out.push(' '),
                1 => out.push('\n'),
                2 => out.push_str("\n\n"),
                _ => out.push_str("\n\n"),
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Delete lines that contain only whitespace. Non-empty lines are untouched.
pub fn remove_empty_lines(content: &str) -> String {
    let had_trailing_newline = content.ends_with('\n');
    let mut out: String = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if had_trailing_newline && !out.is_empty() {
        out.push('\n');
    }
    out
}

fn is_structural_markdown(trimmed: &str) -> bool {
    trimmed.starts_with('#')
        || trimmed.starts_with('>')
        || trimmed.starts_with('|')
        || trimmed.starts_with("- ")
        || trimmed.starts_with("* ")
        || trimmed.starts_with("+ ")
        || ordered_list_marker(trimmed)
}

fn ordered_list_marker(trimmed: &str) -> bool {
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    let rest = &trimmed[digits.len()..];
    rest.starts_with(". ") || rest.starts_with(") ")
}

/// Merge soft-wrapped paragraph text into single lines. Fenced code blocks,
/// indented code, list items, table rows, headings and blockquotes pass
/// through untouched.
pub fn join_paragraphs(content: &str) -> String {
    let mut out_lines: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let flush = |paragraph: &mut Vec<&str>, out_lines: &mut Vec<String>| {
        if !paragraph.is_empty() {
            out_lines.push(paragraph.join(" "));
            paragraph.clear();
        }
    };

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            flush(&mut paragraph, &mut out_lines);
            in_fence = !in_fence;
            out_lines.push(line.to_string());
            continue;
        }
        if in_fence {
            out_lines.push(line.to_string());
            continue;
        }
        if line.trim().is_empty() {
            flush(&mut paragraph, &mut out_lines);
            out_lines.push(String::new());
            continue;
        }
        let indented_code = line.starts_with("    ") || line.starts_with('\t');
        if indented_code || is_structural_markdown(trimmed) {
            flush(&mut paragraph, &mut out_lines);
            out_lines.push(line.to_string());
            continue;
        }
        paragraph.push(line.trim());
    }
    flush(&mut paragraph, &mut out_lines);

    let mut out = out_lines.join("\n");
    if content.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

const SCRAPE_KEYS: [&str; 5] = ["url:", "source:", "scraped", "retrieved", "date:"];

/// Drop the leading HTML comment block that scrapers prepend (URL, fetch
/// date and similar bookkeeping). Anything else passes through unchanged.
pub fn remove_scraped_metadata(content: &str) -> String {
    let trimmed = content.trim_start_matches('\u{feff}');
    let leading_ws = trimmed.len() - trimmed.trim_start().len();
    let body = &trimmed[leading_ws..];
    if !body.starts_with("<!--") {
        return content.to_string();
    }
    let Some(end) = body.find("-->") else {
        return content.to_string();
    };
    let comment = &body[..end];
    let lowered = comment.to_lowercase();
    if !SCRAPE_KEYS.iter().any(|key| lowered.contains(key)) {
        return content.to_string();
    }
    body[end + 3..].trim_start_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_full_line_and_trailing_clike_comments() {
        assert_eq!(strip_comments("// c\nvar x=1;", ".js"), "var x=1;");
        assert_eq!(
            strip_comments("let a = 1; // trailing\nlet b = 2;\n", ".rs"),
            "let a = 1;\nlet b = 2;\n"
        );
    }

    #[test]
    fn block_comments_vanish_with_their_lines() {
        let input = "int x;\n/* one\n   two */\nint y;\n";
        assert_eq!(strip_comments(input, ".c"), "int x;\nint y;\n");
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let input = "let url = \"https://example.com\"; // real comment\n";
        assert_eq!(
            strip_comments(input, ".js"),
            "let url = \"https://example.com\";\n"
        );
        let hash = "msg = \"# not a comment\"  # a comment\n";
        assert_eq!(strip_comments(hash, ".py"), "msg = \"# not a comment\"\n");
    }

    #[test]
    fn python_docstrings_are_not_comments() {
        let input = "def f():\n    \"\"\"Keep # this.\"\"\"\n    return 1  # drop\n";
        assert_eq!(
            strip_comments(input, ".py"),
            "def f():\n    \"\"\"Keep # this.\"\"\"\n    return 1\n"
        );
    }

    #[test]
    fn markup_comments_are_removed() {
        let input = "<p>keep</p>\n<!-- drop\nme -->\n<b>tail</b>\n";
        assert_eq!(strip_comments(input, ".html"), "<p>keep</p>\n<b>tail</b>\n");
    }

    #[test]
    fn unknown_extension_passes_through() {
        let input = "// looks like a comment\n";
        assert_eq!(strip_comments(input, ".unknown"), input);
    }

    #[test]
    fn minify_js_preserves_string_literals() {
        let input = "const s = \"a   b\";\nlet   x   =  1;\n";
        assert_eq!(minify(input, ".js"), "const s = \"a   b\";\nlet x = 1;\n");
    }

    #[test]
    fn minify_markup_drops_inter_tag_whitespace() {
        let input = "<div>\n  <span title=\"a  b\">hi</span>\n</div>\n";
        assert_eq!(
            minify(input, ".html"),
            "<div><span title=\"a  b\">hi</span></div>"
        );
    }

    #[test]
    fn minify_plain_trims_and_collapses_blanks() {
        let input = "alpha  \n\n\n\nbeta\n";
        assert_eq!(minify(input, ".txt"), "alpha\n\nbeta\n");
    }

    #[test]
    fn strip_all_tags_keeps_inner_text() {
        let input = "<div><p>Hello <b>world</b></p></div>";
        assert_eq!(strip_tags(input, &[], &[]), "Hello world");
    }

    #[test]
    fn strip_tags_honors_preserve_list() {
        let input = "<div><code>x</code> and <b>y</b></div>";
        let preserve = vec!["code".to_string()];
        assert_eq!(
            strip_tags(input, &[], &preserve),
            "<code>x</code> and y"
        );
    }

    #[test]
    fn strip_tags_with_list_only_removes_listed() {
        let input = "<div><script>s()</script><p>text</p></div>";
        let strip = vec!["script".to_string()];
        assert_eq!(
            strip_tags(input, &strip, &[]),
            "<div>s()<p>text</p></div>"
        );
    }

    #[test]
    fn bare_less_than_is_not_a_tag() {
        assert_eq!(strip_tags("a < b and <i>c</i>", &[], &[]), "a < b and c");
    }

    #[test]
    fn compress_whitespace_rules() {
        assert_eq!(compress_whitespace("a \t  b"), "a b");
        assert_eq!(compress_whitespace("a\n\nb"), "a\n\nb");
        assert_eq!(compress_whitespace("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn remove_empty_lines_keeps_content_lines_apart() {
        assert_eq!(remove_empty_lines("a\n\n  \nb\nc\n"), "a\nb\nc\n");
    }

    #[test]
    fn join_paragraphs_merges_prose_only() {
        let input = "first line\nsecond line\n\n- item one\n- item two\n\n```\ncode  line\nmore\n```\n";
        let expected =
            "first line second line\n\n- item one\n- item two\n\n```\ncode  line\nmore\n```\n";
        assert_eq!(join_paragraphs(input), expected);
    }

    #[test]
    fn join_paragraphs_leaves_tables_and_headings() {
        let input = "# Title\n| a | b |\n|---|---|\ntext one\ntext two\n";
        assert_eq!(
            join_paragraphs(input),
            "# Title\n| a | b |\n|---|---|\ntext one text two\n"
        );
    }

    #[test]
    fn scraped_metadata_block_is_removed() {
        let input = "<!--\nurl: https://example.com/page\nscraped: 2024-01-01\n-->\n# Title\n";
        assert_eq!(remove_scraped_metadata(input), "# Title\n");
        // An ordinary leading comment stays.
        let plain = "<!-- license header -->\ncontent\n";
        assert_eq!(remove_scraped_metadata(plain), plain);
    }
}
