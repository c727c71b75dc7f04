use std::sync::Arc;

use {
    async_trait::async_trait, parley_channels::MessageService, tokio_util::sync::CancellationToken,
};

/// Name of the transport's block in the configuration document.
pub const TRANSPORT_NAME: &str = "transport";

/// Builds the transport from its configuration block.
pub type TransportFactory =
    Arc<dyn Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn Transport>> + Send + Sync>;

/// The messaging front door: turns provider events into [`parley_common::Message`]s
/// and sends replies back out.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Inbound subscription and outbound sending. `None` when the transport
    /// was configured without messaging.
    fn messages(&self) -> Option<Arc<dyn MessageService>>;

    /// Webhook endpoints, mounted at the root of the mux behind every module
    /// route.
    fn router(&self) -> Option<axum::Router> {
        None
    }

    /// Background upkeep (polling, webhook registration). Runs until `cancel`
    /// fires; an error stops the process.
    async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        cancel.cancelled().await;
        Ok(())
    }

    /// Release resources after every supervised task finished.
    async fn close(&self) {}
}
