/// zlq error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid file-selection regex supplied by the caller
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Engine-level failure: connection setup, DDL, or the caller's query
    #[error("Query error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// The caller's query could not be executed
    #[error("Query failed: {message}")]
    Query { message: String },

    /// IO error on the output stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for zlq operations
pub type Result<T> = std::result::Result<T, Error>;
