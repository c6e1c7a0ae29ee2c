use thiserror::Error;

/// Result alias for `fontclust`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by matrix construction, clustering and persistence.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Item list and matrix disagree in size, or a raw matrix is not square.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// A merge was attempted with fewer than two active clusters.
    #[error("cannot merge: only {active} active cluster(s)")]
    EmptyForest {
        /// Number of clusters left in the forest.
        active: usize,
    },

    /// The renderer or distance oracle could not produce a result.
    #[error("oracle failure for '{item}': {message}")]
    Oracle {
        /// Item being rendered or compared.
        item: String,
        /// Cause reported by the collaborator.
        message: String,
    },

    /// The oracle returned a negative or non-finite distance.
    #[error("invalid distance {value} between items {i} and {j}")]
    InvalidDistance {
        /// Row index.
        i: usize,
        /// Column index.
        j: usize,
        /// Offending value.
        value: f64,
    },

    /// A persisted blob was rejected.
    #[error("store error: {0}")]
    Store(String),

    /// Filesystem failure while reading or writing a persisted blob.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Persisted blob could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::Oracle`] from any displayable cause.
    pub fn oracle(item: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Oracle {
            item: item.into(),
            message: message.to_string(),
        }
    }
}
