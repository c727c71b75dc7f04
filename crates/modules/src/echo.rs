//! `echo`: sends every inbound message straight back to its sender.

use std::sync::Arc;

use {
    async_trait::async_trait,
    parley_channels::{MessageService, reply_message},
    parley_common::Message,
    parley_gateway::{Handler, MessageHandler, ModuleConfig, Transport, TransportBinder},
    serde::Deserialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

pub const NAME: &str = "echo";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EchoSettings {
    /// Only echo messages sent to one of these numbers. Empty echoes
    /// everything.
    pub numbers: Vec<String>,
    /// Text put in front of the echoed body.
    pub prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub echo: EchoSettings,
}

#[derive(Default)]
pub struct EchoModule {
    config: EchoConfig,
    messages: Option<Arc<dyn MessageService>>,
}

impl EchoModule {
    fn accepts(&self, msg: &Message) -> bool {
        let numbers = &self.config.echo.numbers;
        numbers.is_empty() || numbers.iter().any(|n| *n == msg.to)
    }
}

#[async_trait]
impl Handler for EchoModule {
    fn config(&mut self) -> Option<&mut dyn ModuleConfig> {
        Some(&mut self.config)
    }

    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        cancel.cancelled().await;
        Ok(())
    }

    fn transport_binder(&mut self) -> Option<&mut dyn TransportBinder> {
        Some(self)
    }

    fn message_handler(&self) -> Option<&dyn MessageHandler> {
        Some(self)
    }
}

impl TransportBinder for EchoModule {
    fn bind_transport(&mut self, transport: Arc<dyn Transport>) {
        self.messages = transport.messages();
    }
}

#[async_trait]
impl MessageHandler for EchoModule {
    async fn handle_message(&self, _cancel: CancellationToken, msg: Message) {
        if !self.accepts(&msg) {
            return;
        }
        let Some(ref messages) = self.messages else {
            warn!("echo has no transport to reply through");
            return;
        };

        let body = format!("{}{}", self.config.echo.prefix, msg.body);
        match reply_message(messages.as_ref(), &msg, &body).await {
            Ok(()) => debug!(to = %msg.from, "echoed message"),
            Err(e) => warn!(to = %msg.from, error = %e, "failed to echo message"),
        }
    }
}
