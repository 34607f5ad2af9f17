//! Internal invariant failures shared by the holdfix crates.

/// A routing-model invariant that does not hold.
///
/// Raised for states the pipeline never produces itself, such as a committed
/// route that loops. Recoverable findings go to a diagnostic sink instead.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
