//! In-process transport driven over HTTP.
//!
//! Inbound messages arrive as `POST /messages`; everything modules send is
//! kept in a bounded outbox readable at `GET /outbox`. Useful for local
//! development and for exercising modules without a telephony provider.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    parley_channels::{MessageHub, MessageService, validate_phone_number},
    parley_common::Message,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{Transport, TransportFactory};

const DEFAULT_OUTBOX_SIZE: usize = 100;

/// The `[transport]` block.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// The transport's own number. Fills `to` on inbound messages that omit
    /// it.
    pub number: String,
    /// Reject inbound messages whose numbers are not E.164.
    pub validate_numbers: bool,
    /// When set, `POST /messages` requires `Authorization: Bearer <token>`.
    pub api_token: Option<Secret<String>>,
    /// How many outbound messages `GET /outbox` keeps.
    pub outbox_size: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            number: String::new(),
            validate_numbers: false,
            api_token: None,
            outbox_size: DEFAULT_OUTBOX_SIZE,
        }
    }
}

impl fmt::Debug for LoopbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackConfig")
            .field("number", &self.number)
            .field("validate_numbers", &self.validate_numbers)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("outbox_size", &self.outbox_size)
            .finish()
    }
}

struct Shared {
    config: LoopbackConfig,
    hub: Arc<MessageHub>,
    outbox: Mutex<VecDeque<Message>>,
}

impl Shared {
    fn record(&self, msg: Message) {
        let mut outbox = self.outbox.lock().unwrap_or_else(|e| e.into_inner());
        if self.config.outbox_size == 0 {
            return;
        }
        while outbox.len() >= self.config.outbox_size {
            outbox.pop_front();
        }
        outbox.push_back(msg);
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(ref token) = self.config.api_token else {
            return true;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|given| constant_time_eq(given, token.expose_secret()))
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub struct LoopbackTransport {
    shared: Arc<Shared>,
    outbound: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
}

impl LoopbackTransport {
    pub fn new(config: LoopbackConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                config,
                hub: Arc::new(MessageHub::new().with_outbound(tx)),
                outbox: Mutex::new(VecDeque::new()),
            }),
            outbound: Mutex::new(Some(rx)),
        }
    }

    /// Factory for [`crate::ModuleRegistry::set_transport`].
    pub fn factory() -> TransportFactory {
        Arc::new(|block: &serde_json::Value| -> anyhow::Result<Arc<dyn Transport>> {
            let config = if block.is_null() {
                LoopbackConfig::default()
            } else {
                LoopbackConfig::deserialize(block)?
            };
            Ok(Arc::new(Self::new(config)) as Arc<dyn Transport>)
        })
    }

    pub fn config(&self) -> &LoopbackConfig {
        &self.shared.config
    }

    pub fn hub(&self) -> &Arc<MessageHub> {
        &self.shared.hub
    }

    /// Outbound messages recorded so far, oldest first.
    pub fn outbox(&self) -> Vec<Message> {
        self.shared
            .outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn messages(&self) -> Option<Arc<dyn MessageService>> {
        Some(Arc::clone(&self.shared.hub) as Arc<dyn MessageService>)
    }

    fn router(&self) -> Option<Router> {
        Some(
            Router::new()
                .route("/messages", post(inbound_handler))
                .route("/outbox", get(outbox_handler))
                .with_state(Arc::clone(&self.shared)),
        )
    }

    async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(mut rx) = self
            .outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            anyhow::bail!("loopback transport is already running");
        };

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            info!(to = %msg.to, body = %msg.body, "outbound message");
            self.shared.record(msg);
        }
        debug!("loopback transport stopped");
        Ok(())
    }
}

#[derive(Deserialize)]
struct InboundRequest {
    from: String,
    #[serde(default)]
    to: String,
    body: String,
}

fn rejection(status: StatusCode, error: impl fmt::Display) -> Response {
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

async fn inbound_handler(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if !shared.authorized(&headers) {
        warn!("rejected inbound message with bad credentials");
        return rejection(StatusCode::UNAUTHORIZED, "invalid or missing API token");
    }
    let req = match InboundRequest::deserialize(&payload) {
        Ok(req) => req,
        Err(e) => return rejection(StatusCode::BAD_REQUEST, e),
    };

    let to = if req.to.is_empty() {
        shared.config.number.clone()
    } else {
        req.to
    };
    if shared.config.validate_numbers {
        for number in [&req.from, &to] {
            if let Err(e) = validate_phone_number(number) {
                return rejection(StatusCode::BAD_REQUEST, e);
            }
        }
    }

    let msg = Message::new(req.from, to, req.body).with_raw(payload);
    let delivered = shared.hub.publish(&msg);
    debug!(from = %msg.from, delivered, "inbound message accepted");
    (StatusCode::ACCEPTED, Json(json!({ "delivered": delivered }))).into_response()
}

async fn outbox_handler(State(shared): State<Arc<Shared>>) -> Json<Vec<Message>> {
    let outbox = shared.outbox.lock().unwrap_or_else(|e| e.into_inner());
    Json(outbox.iter().cloned().collect())
}
