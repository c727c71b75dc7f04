/// Crate-wide result type for message-bus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared across the message-bus traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address is not an E.164 phone number.
    #[error("invalid phone number {number:?}, must be E.164 format")]
    InvalidPhoneNumber { number: String },

    /// Transport cannot deliver right now (closed, not configured).
    #[error("message delivery unavailable: {message}")]
    Unavailable { message: String },
}

impl Error {
    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}
