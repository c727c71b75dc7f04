use std::path::PathBuf;

/// Errors raised while reading or interpreting the configuration document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A block exists but does not have the expected shape.
    #[error("invalid [{section}] block: {source}")]
    Section {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn section(section: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Section {
            section: section.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
