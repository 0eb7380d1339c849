pub mod actions;
pub mod engine;
pub mod error;
pub mod gather;
pub mod loader;
pub mod matcher;
pub mod pipeline;
pub mod presets;
pub mod processors;
pub mod resolver;
pub mod settings;
pub mod writer;

pub use engine::{EngineOptions, EngineReport, ProcessedFile, SkipReason, process_files};
pub use error::{AppError, Result};
pub use gather::{FileEntry, GatherOptions, gather_files};
pub use loader::{GLOBALS_KEY, MAX_CONFIG_SIZE, load_documents};
pub use matcher::{MatchAxis, normalize_extension};
pub use pipeline::{NoopScanner, Pipeline, RegexScanner, SecretScanner, SecurityFinding};
pub use presets::{DEFAULT_RULE_NAME, GlobalConfig, Rule, RuleGroup};
pub use processors::{ProcessorRegistry, TRUNCATION_MARKER};
pub use resolver::{ResolutionTrace, Resolver, TraceLayer};
pub use settings::{
    ActionKind, LineEnding, ProcessorArgs, SecurityCheckMode, SeparatorStyle, Settings,
    SettingsPatch,
};
pub use writer::{assemble, write_output};
