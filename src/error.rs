use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmuxError {
    #[error("Invalid job: {0}")]
    Validation(String),

    #[error(
        "External tool failed with status {}: {}\n{}",
        .code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()),
        .command,
        .stderr
    )]
    ExternalTool {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Replacement failed: {0}")]
    Replacement(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SubmuxError>;
