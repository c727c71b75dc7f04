/// Marker error meaning "this command does not apply to the message".
///
/// Wrapping it inside an [`anyhow::Error`] chain keeps its meaning: the
/// conversion into [`CommandError`] looks through the whole chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("message did not match command")]
pub struct NotMatched;

/// Outcome of a failed command dispatch.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No command claimed the message. Aggregates move on to the next child.
    #[error("message did not match command")]
    NotMatched,

    /// A command claimed the message and its action failed.
    #[error(transparent)]
    Failed(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    #[must_use]
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(anyhow::anyhow!("{message}"))
    }

    /// True for [`CommandError::NotMatched`] and for failures whose cause
    /// chain carries a [`NotMatched`] marker.
    pub fn is_not_matched(&self) -> bool {
        match self {
            Self::NotMatched => true,
            Self::Failed(err) => chain_not_matched(err),
        }
    }
}

fn chain_not_matched(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.is::<NotMatched>()
            || cause
                .downcast_ref::<CommandError>()
                .is_some_and(CommandError::is_not_matched)
    })
}

impl From<NotMatched> for CommandError {
    fn from(_: NotMatched) -> Self {
        Self::NotMatched
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        if chain_not_matched(&err) {
            Self::NotMatched
        } else {
            Self::Failed(err)
        }
    }
}

impl From<parley_channels::Error> for CommandError {
    fn from(err: parley_channels::Error) -> Self {
        Self::Failed(err.into())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, anyhow::Context};

    #[test]
    fn not_matched_survives_context_wrapping() {
        let wrapped: anyhow::Result<()> = Err(NotMatched).context("looking up contact");
        let err = CommandError::from(wrapped.unwrap_err());
        assert!(err.is_not_matched());
    }

    #[test]
    fn nested_command_error_is_recognized() {
        let inner = anyhow::Error::from(CommandError::NotMatched).context("outer");
        assert!(CommandError::from(inner).is_not_matched());
    }

    #[test]
    fn failure_wrapping_not_matched_is_recognized() {
        let err = CommandError::Failed(anyhow::Error::new(NotMatched).context("unknown contact"));
        assert!(err.is_not_matched());
        assert!(!CommandError::failed("unknown contact").is_not_matched());
    }

    #[test]
    fn message_text_alone_is_not_a_sentinel() {
        let err = CommandError::from(anyhow::anyhow!("message did not match command"));
        assert!(!err.is_not_matched());
    }
}
