use std::{path::Path, str::FromStr};

use tracing::debug;

use crate::{Error, Result, env_subst::substitute_env};

/// File name used when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "parley.toml";

/// Supported document syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension; files without one are TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("toml")
            .parse()
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat(ext.to_string())),
        }
    }
}

/// Read `path`, substitute `${ENV}` placeholders and parse it into a
/// format-independent document tree.
pub fn load_document(path: &Path) -> Result<serde_json::Value> {
    let format = ConfigFormat::from_path(path)?;
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?format, "loading config document");
    parse_document(&substitute_env(&raw), format)
}

/// Parse `raw` text in the given format. No env substitution happens here.
pub fn parse_document(raw: &str, format: ConfigFormat) -> Result<serde_json::Value> {
    let doc = match format {
        ConfigFormat::Toml => {
            let v: toml::Value = toml::from_str(raw)?;
            serde_json::to_value(v)?
        },
        ConfigFormat::Yaml => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            serde_json::to_value(v)?
        },
        ConfigFormat::Json => serde_json::from_str(raw)?,
    };

    if !doc.is_object() {
        return Err(Error::Message(
            "config document must be a table at the top level".into(),
        ));
    }
    Ok(doc)
}
