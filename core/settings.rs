use crate::error::AppError;
use byte_unit::Byte;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to do when the security scanner reports findings for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCheckMode {
    Error,
    Warn,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    Lf,
    Crlf,
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorStyle {
    Standard,
    Detailed,
    Markdown,
    Machine,
    None,
}

/// A named content transform. Order inside `Settings::actions` is the
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Minify,
    StripTags,
    StripComments,
    CompressWhitespace,
    RemoveEmptyLines,
    JoinParagraphs,
    Custom,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Minify => "minify",
            ActionKind::StripTags => "strip_tags",
            ActionKind::StripComments => "strip_comments",
            ActionKind::CompressWhitespace => "compress_whitespace",
            ActionKind::RemoveEmptyLines => "remove_empty_lines",
            ActionKind::JoinParagraphs => "join_paragraphs",
            ActionKind::Custom => "custom",
        }
    }
}

impl FromStr for SecurityCheckMode {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(SecurityCheckMode::Error),
            "warn" => Ok(SecurityCheckMode::Warn),
            "skip" => Ok(SecurityCheckMode::Skip),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown security check mode '{}'. Use error, warn or skip.",
                other
            ))),
        }
    }
}

impl FromStr for LineEnding {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lf" => Ok(LineEnding::Lf),
            "crlf" => Ok(LineEnding::Crlf),
            "preserve" => Ok(LineEnding::Preserve),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown line ending '{}'. Use lf, crlf or preserve.",
                other
            ))),
        }
    }
}

impl FromStr for SeparatorStyle {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(SeparatorStyle::Standard),
            "detailed" => Ok(SeparatorStyle::Detailed),
            "markdown" => Ok(SeparatorStyle::Markdown),
            "machine" => Ok(SeparatorStyle::Machine),
            "none" => Ok(SeparatorStyle::None),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown separator style '{}'. Use standard, detailed, markdown, machine or none.",
                other
            ))),
        }
    }
}

impl FromStr for ActionKind {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minify" => Ok(ActionKind::Minify),
            "strip_tags" => Ok(ActionKind::StripTags),
            "strip_comments" => Ok(ActionKind::StripComments),
            "compress_whitespace" => Ok(ActionKind::CompressWhitespace),
            "remove_empty_lines" => Ok(ActionKind::RemoveEmptyLines),
            "join_paragraphs" => Ok(ActionKind::JoinParagraphs),
            "custom" => Ok(ActionKind::Custom),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown action '{}'.",
                other
            ))),
        }
    }
}

/// Opaque argument bag handed to a custom processor. Keys keep their
/// definition order so diagnostics print them the way the user wrote them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorArgs(pub IndexMap<String, serde_yml::Value>);

impl ProcessorArgs {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_u64(key).map(|v| v as usize)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.0.get(key).and_then(|v| v.as_sequence()).map(|seq| {
            seq.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
    }
}

/// The fully-resolved configuration for one file. Every field is populated;
/// the pipeline never sees a partial record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub security_check: SecurityCheckMode,
    pub max_file_size: Option<Byte>,
    pub include_hidden: bool,
    pub include_binary: bool,
    pub remove_scraped_metadata: bool,
    pub line_ending: LineEnding,
    pub separator_style: SeparatorStyle,
    pub include_metadata: bool,
    pub max_lines: Option<usize>,
    pub actions: Vec<ActionKind>,
    pub custom_processor: Option<String>,
    pub processor_args: ProcessorArgs,
    pub strip_tags: Vec<String>,
    pub preserve_tags: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            security_check: SecurityCheckMode::Skip,
            max_file_size: None,
            include_hidden: false,
            include_binary: false,
            remove_scraped_metadata: false,
            line_ending: LineEnding::Lf,
            separator_style: SeparatorStyle::Standard,
            include_metadata: true,
            max_lines: None,
            actions: Vec::new(),
            custom_processor: None,
            processor_args: ProcessorArgs::default(),
            strip_tags: Vec::new(),
            preserve_tags: Vec::new(),
        }
    }
}

/// A sparse settings record: one configuration layer. Absent fields leave the
/// narrower layers untouched, which is what makes "explicitly set" and
/// "happens to equal the default" distinguishable.
///
/// For `max_file_size` and `max_lines` a value of 0 means "unbounded", so a
/// narrow scope can lift a limit a broader scope imposed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SettingsPatch {
    pub security_check: Option<SecurityCheckMode>,
    pub max_file_size: Option<Byte>,
    pub include_hidden: Option<bool>,
    pub include_binary: Option<bool>,
    pub remove_scraped_metadata: Option<bool>,
    pub line_ending: Option<LineEnding>,
    pub separator_style: Option<SeparatorStyle>,
    pub include_metadata: Option<bool>,
    pub max_lines: Option<u64>,
    pub actions: Option<Vec<ActionKind>>,
    pub custom_processor: Option<String>,
    pub processor_args: Option<ProcessorArgs>,
    pub strip_tags: Option<Vec<String>>,
    pub preserve_tags: Option<Vec<String>>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Overwrite `settings` with every field this patch carries. List-valued
    /// fields are replaced wholesale, never concatenated with the previous
    /// layer's value.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(mode) = self.security_check {
            settings.security_check = mode;
        }
        if let Some(size) = self.max_file_size {
            settings.max_file_size = if size.as_u64() == 0 { None } else { Some(size) };
        }
        if let Some(hidden) = self.include_hidden {
            settings.include_hidden = hidden;
        }
        if let Some(binary) = self.include_binary {
            settings.include_binary = binary;
        }
        if let Some(scraped) = self.remove_scraped_metadata {
            settings.remove_scraped_metadata = scraped;
        }
        if let Some(ending) = self.line_ending {
            settings.line_ending = ending;
        }
        if let Some(style) = self.separator_style {
            settings.separator_style = style;
        }
        if let Some(meta) = self.include_metadata {
            settings.include_metadata = meta;
        }
        if let Some(lines) = self.max_lines {
            settings.max_lines = if lines == 0 { None } else { Some(lines as usize) };
        }
        if let Some(actions) = &self.actions {
            settings.actions = actions.clone();
        }
        if let Some(name) = &self.custom_processor {
            settings.custom_processor = Some(name.clone());
        }
        if let Some(args) = &self.processor_args {
            settings.processor_args = args.clone();
        }
        if let Some(tags) = &self.strip_tags {
            settings.strip_tags = tags.clone();
        }
        if let Some(tags) = &self.preserve_tags {
            settings.preserve_tags = tags.clone();
        }
    }
}
