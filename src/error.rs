//! Error types for storyreel.

use thiserror::Error;

/// Library-level error type for storyreel operations.
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Closed classification of failures, used for logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Config,
    Provider,
    Resource,
    Render,
    Interrupted,
    Internal,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Input => 2,
            ErrorKind::Config => 3,
            ErrorKind::Provider => 4,
            ErrorKind::Resource => 5,
            ErrorKind::Render => 6,
            ErrorKind::Interrupted => 130,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Input => "InputError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Provider => "ProviderError",
            ErrorKind::Resource => "ResourceError",
            ErrorKind::Render => "RenderError",
            ErrorKind::Interrupted => "Interrupted",
            ErrorKind::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

impl ReelError {
    /// The closed kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReelError::Input(_) => ErrorKind::Input,
            ReelError::Config(_) | ReelError::TomlParse(_) => ErrorKind::Config,
            ReelError::Provider(_) => ErrorKind::Provider,
            ReelError::Resource(_) | ReelError::ToolNotFound(_) | ReelError::Io(_) => {
                ErrorKind::Resource
            }
            ReelError::Render(_) => ErrorKind::Render,
            ReelError::Interrupted => ErrorKind::Interrupted,
            ReelError::Json(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for storyreel operations.
pub type Result<T> = std::result::Result<T, ReelError>;
