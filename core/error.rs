use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("YAML Parsing Error: {0}")]
    YamlParse(String),

    #[error(
        "Configuration document '{path}' is {size} bytes, which exceeds the {limit} byte limit"
    )]
    ConfigTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error(
        "Invalid custom processor name '{name}' (group '{group}', rule '{rule}'): names must match [A-Za-z0-9_]+"
    )]
    InvalidProcessorName {
        group: String,
        rule: String,
        name: String,
    },

    #[error("Path '{path}' in group '{group}' resolves outside the project root")]
    PathEscapesRoot { group: String, path: PathBuf },

    #[error(
        "Unsupported pattern '{pattern}' (group '{group}', rule '{rule}'): negation patterns are not supported; remove the leading '!'"
    )]
    UnsupportedPatternSyntax {
        group: String,
        rule: String,
        pattern: String,
    },

    #[error("Unknown custom processor '{name}' for file '{path}'")]
    UnknownProcessor { path: PathBuf, name: String },

    #[error("Custom processor '{name}' failed on file '{path}': {message}")]
    ProcessorExecution {
        path: PathBuf,
        name: String,
        message: String,
    },

    #[error("Security check failed for file '{path}': {findings} finding(s)")]
    SecurityCheck { path: PathBuf, findings: usize },

    #[error("Glob Pattern Error in {scope}: {message}")]
    Glob { scope: String, message: String },

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Walk Error: {0}")]
    Ignore(#[from] ignore::Error),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
}

impl AppError {
    /// True for errors scoped to a single file. These never abort the run
    /// unless strict mode is enabled; load-time errors always do.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            AppError::UnknownProcessor { .. }
                | AppError::ProcessorExecution { .. }
                | AppError::SecurityCheck { .. }
                | AppError::FileRead { .. }
        )
    }
}

impl From<serde_yml::Error> for AppError {
    fn from(err: serde_yml::Error) -> Self {
        AppError::YamlParse(err.to_string())
    }
}

impl From<globset::Error> for AppError {
    fn from(err: globset::Error) -> Self {
        AppError::Glob {
            scope: "pattern set".to_string(),
            message: err.to_string(),
        }
    }
}
