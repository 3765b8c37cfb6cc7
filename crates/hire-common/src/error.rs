//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, HireError>;

/// Main error type for shared domain operations
#[derive(Error, Debug)]
pub enum HireError {
    #[error("Unsupported table kind '{0}'. Must be one of: departments, jobs, hired_employees")]
    UnsupportedTableKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
