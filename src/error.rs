use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal problems with the configuration document. Nothing is swept when
/// one of these is returned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Error loading configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in configuration file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Missing \"settings\" section in configuration")]
    MissingSettings,

    #[error("Configuration must have at least one handler section (git, edt, database)")]
    NoKindSection,

    #[error("Invalid platform version mask '{mask}': {reason}")]
    InvalidVersionMask { mask: String, reason: String },
}

/// Failure of one external tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {} seconds", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("Return code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("I/O error while waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failure of one candidate inside the pipeline.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("{0}")]
    Lock(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{context}: {source}")]
    Step {
        context: String,
        #[source]
        source: ToolError,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SweepError {
    pub fn step(context: impl Into<String>, source: ToolError) -> Self {
        SweepError::Step {
            context: context.into(),
            source,
        }
    }
}
