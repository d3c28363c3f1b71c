use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lexical index has not been built")]
    IndexNotBuilt,

    #[error("Vector search unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
