use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("No content to search")]
    EmptyIndex,

    #[error("{0}")]
    ExtractionFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap a collaborator failure (embedder, extractor) keeping its full cause chain.
    pub fn extraction(err: &anyhow::Error) -> Self {
        Self::ExtractionFailure(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
