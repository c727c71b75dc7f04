//! Configuration document loading.
//!
//! One document (`parley.toml`, `parley.yaml` or `parley.json`) holds the
//! loader's own `[parley]` block, the transport block and one block per
//! module. Each block may carry `enable = true`.
//!
//! Supports `${ENV_VAR}` substitution in the raw text before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod section;

pub use {
    error::{Error, Result},
    loader::{ConfigFormat, DEFAULT_CONFIG_FILE, load_document, parse_document},
    section::{enabled_blocks, section},
};
