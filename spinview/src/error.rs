use thiserror::Error;

/// Failure modes of the selection/overlay core. These indicate misuse or
/// exhausted capacity and are raised immediately; user-input problems at
/// the file boundary travel as logged strings instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An id was passed that does not (or no longer does) exist.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The operation does not apply to the given data.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// All palette slots are checked out.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}
