//! Types shared by every parley crate.

pub mod types;

pub use types::Message;
