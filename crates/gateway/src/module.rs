//! The handler contract every module implements.
//!
//! [`Handler`] is mandatory. The other traits are optional capabilities; the
//! loader asks for each one through the matching probe method on `Handler`,
//! so a module picks any subset by overriding the probes it supports.

use std::sync::Arc;

use {
    async_trait::async_trait, parley_commands::Command, parley_common::Message,
    serde::de::DeserializeOwned, tokio_util::sync::CancellationToken,
};

use crate::Transport;

/// A long-lived module instance created by its registered constructor.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Where this module's configuration goes. The target is filled from the
    /// whole document, so modules wrap their settings in a block named after
    /// themselves.
    fn config(&mut self) -> Option<&mut dyn ModuleConfig> {
        None
    }

    /// Run the module until `cancel` fires. Returning an error stops the
    /// whole process.
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()>;

    fn transport_binder(&mut self) -> Option<&mut dyn TransportBinder> {
        None
    }

    fn commander(&self) -> Option<&dyn CommandHandler> {
        None
    }

    fn message_handler(&self) -> Option<&dyn MessageHandler> {
        None
    }

    fn http(&self) -> Option<&dyn HttpHandler> {
        None
    }
}

/// Target for a module's configuration.
///
/// Implemented for every deserializable type, so modules usually just return
/// their config struct.
pub trait ModuleConfig: Send {
    fn load(&mut self, document: &serde_json::Value) -> serde_json::Result<()>;
}

impl<T> ModuleConfig for T
where
    T: DeserializeOwned + Send,
{
    fn load(&mut self, document: &serde_json::Value) -> serde_json::Result<()> {
        *self = T::deserialize(document)?;
        Ok(())
    }
}

/// Receives the configured transport during config load.
pub trait TransportBinder: Send + Sync {
    fn bind_transport(&mut self, transport: Arc<dyn Transport>);
}

/// Owns a command tree that the loader runs against every inbound message.
pub trait CommandHandler: Send + Sync {
    fn command(&self) -> Command;
}

/// Handles raw inbound messages. Each call runs on its own task.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, cancel: CancellationToken, msg: Message);
}

/// Serves HTTP under a fixed prefix of the shared mux.
pub trait HttpHandler: Send + Sync {
    /// Mount point, e.g. `/ping`. Must start with `/` and must not end with
    /// one.
    fn http_prefix(&self) -> &str;

    fn router(&self) -> axum::Router;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde::Deserialize, serde_json::json};

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct EchoBlock {
        prefix: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct EchoConfig {
        echo: EchoBlock,
    }

    #[test]
    fn config_loads_from_document_root() {
        let mut cfg = EchoConfig::default();
        let target: &mut dyn ModuleConfig = &mut cfg;
        target
            .load(&json!({"echo": {"enable": true, "prefix": "> "}, "other": {}}))
            .unwrap();
        assert_eq!(cfg.echo.prefix, "> ");
    }

    #[test]
    fn config_type_errors_surface() {
        let mut cfg = EchoConfig::default();
        assert!(cfg.load(&json!({"echo": {"prefix": 7}})).is_err());
    }
}
