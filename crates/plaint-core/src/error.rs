use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaintError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    // Flow errors
    #[error("Flow node not registered: {0}")]
    UnknownNode(String),

    #[error("Flow exceeded step limit ({0})")]
    StepLimitExceeded(usize),

    // Task registry errors
    #[error("Task already exists: {0}")]
    DuplicateTask(String),

    #[error("Stream already attached for task: {0}")]
    StreamAttached(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlaintError>;
