use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReadError>;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("requested generation {requested} does not match server generation {actual}")]
    GenerationMismatch { requested: i64, actual: i64 },

    #[error("cannot read gzip encoded object: content encoding support is disabled")]
    GzipUnsupported,

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("unrecoverable failure: {0}")]
    Fatal(String),

    #[error("channel is closed")]
    ChannelClosed,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ReadError {
    /// Whether retrying the failed operation is expected to help.
    ///
    /// Only [`ReadError::Transient`] qualifies; everything else is terminal
    /// for the operation that produced it.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReadError::Transient(_))
    }
}
