use std::error::Error as StdError;

/// Errors raised while registering, configuring or running modules.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("illegal module name: {0}")]
    ReservedName(String),

    #[error("module {0:?} is already registered")]
    DuplicateModule(String),

    #[error(transparent)]
    Config(#[from] parley_config::Error),

    #[error("invalid config for module {module:?}")]
    ModuleConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("transport is enabled but no transport is registered")]
    NoTransport,

    #[error("failed to create transport")]
    TransportInit {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("invalid HTTP prefix {prefix:?} for module {module:?}: {reason}")]
    HttpPrefix {
        module: String,
        prefix: String,
        reason: &'static str,
    },

    #[error("{0} is not enabled")]
    NotEnabled(String),

    #[error("module {module:?} needs the transport, but it is not configured")]
    TransportRequired { module: String },

    #[error("module {module:?} needs transport messaging, but the transport has none")]
    MessagingUnavailable { module: String },

    #[error("failed to start module {module:?}")]
    ModuleStart {
        module: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("transport stopped")]
    TransportRun {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("HTTP server on {addr} failed")]
    Http {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("supervised task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    #[must_use]
    pub fn module_start(module: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ModuleStart {
            module: module.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn transport_init(source: anyhow::Error) -> Self {
        Self::TransportInit {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn transport_run(source: anyhow::Error) -> Self {
        Self::TransportRun {
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
