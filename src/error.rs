use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid theme mode: {0}")]
    InvalidMode(String),

    #[error("Unknown browser: {0}")]
    UnknownBrowser(String),

    #[error("Invalid schedule: {0}")]
    Schedule(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Settings error: {0}")]
    Config(String),
}
