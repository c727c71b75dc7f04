//! `ping`: liveness check over SMS and HTTP.
//!
//! `ping, echo <text>` (or `/ping echo <text>`) replies with the text; any
//! other `ping` message gets the configured reply. `GET /ping` answers with the
//! same reply.

use std::sync::Arc;

use {
    async_trait::async_trait,
    axum::{Router, routing::get},
    parley_channels::{MessageService, reply_message},
    parley_commands::{Command, CommandError, CommandMessage, Prefix},
    parley_gateway::{
        CommandHandler, Handler, HttpHandler, ModuleConfig, Transport, TransportBinder,
    },
    serde::Deserialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

pub const NAME: &str = "ping";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PingSettings {
    pub reply: String,
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            reply: "pong".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    pub ping: PingSettings,
}

#[derive(Default)]
pub struct PingModule {
    config: PingConfig,
    messages: Option<Arc<dyn MessageService>>,
}

impl PingModule {
    pub fn settings(&self) -> &PingSettings {
        &self.config.ping
    }
}

async fn reply(
    messages: Option<Arc<dyn MessageService>>,
    msg: &CommandMessage,
    body: &str,
) -> parley_commands::Result<()> {
    let messages = messages.ok_or_else(|| CommandError::failed("no transport bound"))?;
    reply_message(messages.as_ref(), &msg.original, body).await?;
    debug!(to = %msg.original.from, "ping replied");
    Ok(())
}

#[async_trait]
impl Handler for PingModule {
    fn config(&mut self) -> Option<&mut dyn ModuleConfig> {
        Some(&mut self.config)
    }

    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!(reply = %self.config.ping.reply, "ping ready");
        cancel.cancelled().await;
        Ok(())
    }

    fn transport_binder(&mut self) -> Option<&mut dyn TransportBinder> {
        Some(self)
    }

    fn commander(&self) -> Option<&dyn CommandHandler> {
        Some(self)
    }

    fn http(&self) -> Option<&dyn HttpHandler> {
        Some(self)
    }
}

impl TransportBinder for PingModule {
    fn bind_transport(&mut self, transport: Arc<dyn Transport>) {
        self.messages = transport.messages();
    }
}

impl CommandHandler for PingModule {
    fn command(&self) -> Command {
        let echo = {
            let messages = self.messages.clone();
            move |_cancel: CancellationToken, msg: CommandMessage| {
                let messages = messages.clone();
                async move {
                    if msg.body.is_empty() {
                        return Err(CommandError::failed("nothing to echo"));
                    }
                    reply(messages, &msg, &msg.body).await
                }
            }
        };

        let pong = {
            let messages = self.messages.clone();
            let body = self.config.ping.reply.clone();
            move |_cancel: CancellationToken, msg: CommandMessage| {
                let messages = messages.clone();
                let body = body.clone();
                async move { reply(messages, &msg, &body).await }
            }
        };

        Command::group(Prefix::any([Prefix::natural(NAME), Prefix::slash(NAME)]), vec![
            Command::new(Prefix::word("echo", false), echo),
            Command::new(Prefix::new(|body| Some(body)), pong),
        ])
    }
}

impl HttpHandler for PingModule {
    fn http_prefix(&self) -> &str {
        "/ping"
    }

    fn router(&self) -> Router {
        let body = self.config.ping.reply.clone();
        Router::new().route(
            "/",
            get(move || {
                let body = body.clone();
                async move { body }
            }),
        )
    }
}
