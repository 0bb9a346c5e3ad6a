use thiserror::Error;

/// Library error type for catalog loading and validation.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog file parsed but its contents are unusable.
    #[error("invalid catalog: {0}")]
    BadCatalog(String),

    /// The catalog file parsed but contains no items.
    #[error("catalog contains no items")]
    EmptyCatalog,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
