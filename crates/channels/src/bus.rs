use std::sync::Arc;

use {async_trait::async_trait, parley_common::Message, tokio::sync::mpsc};

use crate::{MessageFilters, Result};

/// A service that fans inbound messages out to subscribers.
///
/// Every subscriber receives its own copy of each message its filters accept;
/// subscribers never compete for messages.
pub trait MessageSubscriber: Send + Sync {
    /// Deliver every inbound message accepted by `filters` to `tx`.
    fn subscribe(&self, tx: mpsc::UnboundedSender<Message>, filters: MessageFilters);

    /// Stop delivering to the channel behind `tx`.
    fn unsubscribe(&self, tx: &mpsc::UnboundedSender<Message>);
}

/// A service that can send messages.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, msg: Message) -> Result<()>;

    /// Synchronous reply fast path, if the service offers one.
    fn replier(&self) -> Option<&dyn MessageReplier> {
        None
    }
}

/// Optional refinement of [`MessageSender`] for services that can answer a
/// message directly (for example inside the webhook response).
#[async_trait]
pub trait MessageReplier: MessageSender {
    async fn reply_message(&self, original: &Message, body: &str) -> Result<()>;
}

/// Both halves of a transport: inbound subscription and outbound sending.
pub trait MessageService: MessageSubscriber + MessageSender {}

impl<T: MessageSubscriber + MessageSender + ?Sized> MessageService for T {}

/// Build the reply to `original`: endpoints swapped, `body` as text.
pub fn new_reply(original: &Message, body: impl Into<String>) -> Message {
    Message::new(original.to.clone(), original.from.clone(), body)
}

/// Reply to `original` through `sender`, using its [`MessageReplier`] fast
/// path when available.
pub async fn reply_message<S>(sender: &S, original: &Message, body: &str) -> Result<()>
where
    S: MessageSender + ?Sized,
{
    if let Some(replier) = sender.replier() {
        return replier.reply_message(original, body).await;
    }
    sender.send_message(new_reply(original, body)).await
}

/// Joins a separate subscriber and sender into one [`MessageService`].
pub struct CombinedMessageService {
    subscriber: Arc<dyn MessageSubscriber>,
    sender: Arc<dyn MessageSender>,
}

impl CombinedMessageService {
    pub fn new(subscriber: Arc<dyn MessageSubscriber>, sender: Arc<dyn MessageSender>) -> Self {
        Self { subscriber, sender }
    }
}

impl MessageSubscriber for CombinedMessageService {
    fn subscribe(&self, tx: mpsc::UnboundedSender<Message>, filters: MessageFilters) {
        self.subscriber.subscribe(tx, filters);
    }

    fn unsubscribe(&self, tx: &mpsc::UnboundedSender<Message>) {
        self.subscriber.unsubscribe(tx);
    }
}

#[async_trait]
impl MessageSender for CombinedMessageService {
    async fn send_message(&self, msg: Message) -> Result<()> {
        self.sender.send_message(msg).await
    }

    fn replier(&self) -> Option<&dyn MessageReplier> {
        self.sender.replier()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_message(&self, msg: Message) -> Result<()> {
            self.sent.lock().unwrap().push(msg);
            Ok(())
        }
    }

    /// Records replies separately so tests can tell which path was taken.
    #[derive(Default)]
    struct FastReplier {
        sent: Mutex<Vec<Message>>,
        replies: Mutex<Vec<(Message, String)>>,
    }

    #[async_trait]
    impl MessageSender for FastReplier {
        async fn send_message(&self, msg: Message) -> Result<()> {
            self.sent.lock().unwrap().push(msg);
            Ok(())
        }

        fn replier(&self) -> Option<&dyn MessageReplier> {
            Some(self)
        }
    }

    #[async_trait]
    impl MessageReplier for FastReplier {
        async fn reply_message(&self, original: &Message, body: &str) -> Result<()> {
            self.replies
                .lock()
                .unwrap()
                .push((original.clone(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn new_reply_swaps_endpoints() {
        let original = Message::new("+15550001", "+15550002", "ping");
        let reply = new_reply(&original, "pong");
        assert_eq!(reply.from, "+15550002");
        assert_eq!(reply.to, "+15550001");
        assert_eq!(reply.body, "pong");
        assert!(reply.raw.is_none());
    }

    #[tokio::test]
    async fn reply_falls_back_to_send() {
        let sender = RecordingSender::default();
        let original = Message::new("A", "B", "ping");
        reply_message(&sender, &original, "pong").await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[Message::new("B", "A", "pong")]);
    }

    #[tokio::test]
    async fn reply_prefers_fast_path() {
        let sender = FastReplier::default();
        let original = Message::new("A", "B", "ping");
        reply_message(&sender, &original, "pong").await.unwrap();

        assert!(sender.sent.lock().unwrap().is_empty());
        let replies = sender.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, original);
        assert_eq!(replies[0].1, "pong");
    }

    #[tokio::test]
    async fn combined_service_forwards_replier() {
        let fast = Arc::new(FastReplier::default());
        let hub = Arc::new(crate::MessageHub::new());
        let combined = CombinedMessageService::new(hub, fast.clone());

        let original = Message::new("A", "B", "ping");
        reply_message(&combined, &original, "pong").await.unwrap();
        assert_eq!(fast.replies.lock().unwrap().len(), 1);
    }
}
