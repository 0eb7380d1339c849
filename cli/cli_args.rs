use clap::{Args, Parser, Subcommand};
use monofile_core::{ActionKind, SettingsPatch};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectOpts {
    #[arg(
        long,
        help = "Specify the target project directory (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long = "preset",
        value_name = "FILE",
        action = clap::ArgAction::Append,
        help = "Preset document to load. Repeatable; later files override earlier ones at group granularity.",
        help_heading = "Project Setup"
    )]
    pub presets: Vec<PathBuf>,

    #[arg(
        long,
        help = "Do not load the default preset document (monofile.yaml) even if present.",
        help_heading = "Project Setup"
    )]
    pub no_default_presets: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(long = "include", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Add include glob for the file walk.", help_heading = "Content Filtering")]
    pub include: Vec<String>,

    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Add exclude glob for the file walk.", help_heading = "Content Filtering")]
    pub exclude: Vec<String>,

    #[arg(
        long,
        help = "Do not honor .gitignore files during the walk.",
        help_heading = "Content Filtering"
    )]
    pub no_gitignore: bool,
}

/// Per-field settings overrides. Only flags the user explicitly passed end up
/// in the patch, so an untouched flag never clobbers a preset value.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideOpts {
    #[arg(long, value_name = "MODE", value_parser = ["error", "warn", "skip"], help = "Override the security check mode.", help_heading = "Settings Overrides")]
    pub security_check: Option<String>,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Override the per-file size limit (e.g. '256KB'; 0 = unbounded).",
        help_heading = "Settings Overrides"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        long,
        help = "Include hidden files.",
        overrides_with = "disable_hidden",
        help_heading = "Settings Overrides"
    )]
    pub enable_hidden: bool,
    #[arg(
        long,
        help = "Exclude hidden files.",
        overrides_with = "enable_hidden",
        help_heading = "Settings Overrides"
    )]
    pub disable_hidden: bool,

    #[arg(
        long,
        help = "Include binary files.",
        overrides_with = "disable_binary",
        help_heading = "Settings Overrides"
    )]
    pub enable_binary: bool,
    #[arg(
        long,
        help = "Exclude binary files.",
        overrides_with = "enable_binary",
        help_heading = "Settings Overrides"
    )]
    pub disable_binary: bool,

    #[arg(
        long,
        help = "Strip leading scraper-metadata comment blocks.",
        overrides_with = "keep_scraped_metadata",
        help_heading = "Settings Overrides"
    )]
    pub remove_scraped_metadata: bool,
    #[arg(
        long,
        help = "Keep leading scraper-metadata comment blocks.",
        overrides_with = "remove_scraped_metadata",
        help_heading = "Settings Overrides"
    )]
    pub keep_scraped_metadata: bool,

    #[arg(long, value_name = "STYLE", value_parser = ["lf", "crlf", "preserve"], help = "Override the output line ending.", help_heading = "Settings Overrides")]
    pub line_ending: Option<String>,

    #[arg(long, value_name = "STYLE", value_parser = ["standard", "detailed", "markdown", "machine", "none"], help = "Override the file separator style.", help_heading = "Settings Overrides")]
    pub separator_style: Option<String>,

    #[arg(
        long,
        help = "Include per-file metadata in detailed separators.",
        overrides_with = "disable_metadata",
        help_heading = "Settings Overrides"
    )]
    pub enable_metadata: bool,
    #[arg(
        long,
        help = "Omit per-file metadata from detailed separators.",
        overrides_with = "enable_metadata",
        help_heading = "Settings Overrides"
    )]
    pub disable_metadata: bool,

    #[arg(
        long,
        value_name = "N",
        help = "Truncate each file to N lines (0 = unbounded).",
        help_heading = "Settings Overrides"
    )]
    pub max_lines: Option<u64>,

    #[arg(
        long,
        value_name = "LIST",
        value_delimiter = ',',
        help = "Override the action list (comma-separated, applied in order).",
        help_heading = "Settings Overrides"
    )]
    pub actions: Option<Vec<String>>,

    #[arg(
        long,
        value_name = "LIST",
        value_delimiter = ',',
        help = "Override the tag names removed by strip_tags.",
        help_heading = "Settings Overrides"
    )]
    pub strip_tags: Option<Vec<String>>,

    #[arg(
        long,
        value_name = "LIST",
        value_delimiter = ',',
        help = "Override the tag names preserved by strip_tags.",
        help_heading = "Settings Overrides"
    )]
    pub preserve_tags: Option<Vec<String>>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Override the custom processor name used by the custom action.",
        help_heading = "Settings Overrides"
    )]
    pub custom_processor: Option<String>,
}

impl OverrideOpts {
    /// Build the top-precedence patch from explicitly supplied flags only.
    pub fn to_patch(&self) -> anyhow::Result<SettingsPatch> {
        let mut patch = SettingsPatch::default();

        if let Some(mode) = &self.security_check {
            patch.security_check = Some(mode.parse()?);
        }
        if let Some(size) = &self.max_file_size {
            let parsed = byte_unit::Byte::parse_str(size, true)
                .map_err(|e| anyhow::anyhow!("Invalid --max-file-size '{}': {}", size, e))?;
            patch.max_file_size = Some(parsed);
        }
        if self.enable_hidden {
            patch.include_hidden = Some(true);
        }
        if self.disable_hidden {
            patch.include_hidden = Some(false);
        }
        if self.enable_binary {
            patch.include_binary = Some(true);
        }
        if self.disable_binary {
            patch.include_binary = Some(false);
        }
        if self.remove_scraped_metadata {
            patch.remove_scraped_metadata = Some(true);
        }
        if self.keep_scraped_metadata {
            patch.remove_scraped_metadata = Some(false);
        }
        if let Some(ending) = &self.line_ending {
            patch.line_ending = Some(ending.parse()?);
        }
        if let Some(style) = &self.separator_style {
            patch.separator_style = Some(style.parse()?);
        }
        if self.enable_metadata {
            patch.include_metadata = Some(true);
        }
        if self.disable_metadata {
            patch.include_metadata = Some(false);
        }
        if let Some(lines) = self.max_lines {
            patch.max_lines = Some(lines);
        }
        if let Some(actions) = &self.actions {
            let parsed: Result<Vec<ActionKind>, _> =
                actions.iter().map(|name| name.parse()).collect();
            patch.actions = Some(parsed?);
        }
        if let Some(tags) = &self.strip_tags {
            patch.strip_tags = Some(tags.clone());
        }
        if let Some(tags) = &self.preserve_tags {
            patch.preserve_tags = Some(tags.clone());
        }
        if let Some(name) = &self.custom_processor {
            patch.custom_processor = Some(name.clone());
        }
        Ok(patch)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bundle a project tree into one text artifact for LLM context windows.",
    long_about = "monofile walks a project, resolves per-file settings from layered preset\ndocuments (CLI > matched rule > per-extension > global defaults) and applies\nan ordered pipeline of content transforms before writing a single bundle.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  monofile bundle --preset presets.yaml -o bundle.txt\n  monofile bundle --actions strip_comments,minify --max-lines 200\n  monofile resolve src/app.js -f yaml\n  monofile presets --preset presets.yaml",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "b",
        about = "Gather, resolve and transform files into one bundle."
    )]
    Bundle(BundleArgs),

    #[command(
        visible_alias = "r",
        about = "Show the per-file settings resolution trace."
    )]
    Resolve(ResolveArgs),

    #[command(
        visible_alias = "p",
        about = "List loaded preset groups and rules in resolution order."
    )]
    Presets(PresetsArgs),

    #[command(about = "Generate shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BundleArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub overrides: OverrideOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the bundle to FILE instead of standard output.",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Abort on the first per-file failure instead of skipping the file.",
        help_heading = "Output Control"
    )]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
    #[clap(flatten)]
    pub overrides: OverrideOpts,
    #[clap(flatten)]
    pub format: FormatOpts,

    #[arg(
        required = true,
        value_name = "PATH",
        help = "File path(s), relative to the project root, to trace."
    )]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PresetsArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
    #[clap(flatten)]
    pub format: FormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
}
