use std::sync::RwLock;

use {
    async_trait::async_trait,
    parley_common::Message,
    tokio::sync::mpsc,
    tracing::{debug, trace},
};

use crate::{Error, MessageFilters, MessageSender, MessageSubscriber, Result, filter_message};

struct Subscription {
    tx: mpsc::UnboundedSender<Message>,
    filters: MessageFilters,
}

/// In-process subscriber registry.
///
/// Transports push inbound messages with [`MessageHub::publish`]; every live
/// subscriber whose filters accept a message gets a clone of it. Outbound
/// messages go to an optional sink owned by the transport.
pub struct MessageHub {
    subscribers: RwLock<Vec<Subscription>>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

impl Default for MessageHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHub {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            outbound: None,
        }
    }

    /// Route messages passed to [`MessageSender::send_message`] into `tx`.
    #[must_use]
    pub fn with_outbound(mut self, tx: mpsc::UnboundedSender<Message>) -> Self {
        self.outbound = Some(tx);
        self
    }

    /// Fan `msg` out to every matching subscriber. Returns how many
    /// subscribers received it.
    ///
    /// Subscribers whose receiving end was dropped are removed.
    pub fn publish(&self, msg: &Message) -> usize {
        let mut delivered = 0;
        let mut closed = false;
        {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for sub in subscribers.iter() {
                if !filter_message(&sub.filters, msg) {
                    continue;
                }
                if sub.tx.send(msg.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed = true;
                }
            }
        }

        if closed {
            let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            subscribers.retain(|sub| !sub.tx.is_closed());
        }

        trace!(from = %msg.from, to = %msg.to, delivered, "published inbound message");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl MessageSubscriber for MessageHub {
    fn subscribe(&self, tx: mpsc::UnboundedSender<Message>, filters: MessageFilters) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.push(Subscription { tx, filters });
        debug!(count = subscribers.len(), "subscriber added");
    }

    fn unsubscribe(&self, tx: &mpsc::UnboundedSender<Message>) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|sub| !sub.tx.same_channel(tx));
        debug!(count = subscribers.len(), "subscriber removed");
    }
}

#[async_trait]
impl MessageSender for MessageHub {
    async fn send_message(&self, msg: Message) -> Result<()> {
        let Some(ref outbound) = self.outbound else {
            return Err(Error::unavailable("no outbound sink configured"));
        };
        debug!(from = %msg.from, to = %msg.to, "sending message");
        outbound
            .send(msg)
            .map_err(|_| Error::unavailable("outbound sink closed"))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_a_copy() {
        let hub = MessageHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.subscribe(tx1, MessageFilters::all());
        hub.subscribe(tx2, MessageFilters::all());

        let msg = Message::new("A", "B", "hi");
        assert_eq!(hub.publish(&msg), 2);
        assert_eq!(rx1.try_recv().unwrap(), msg);
        assert_eq!(rx2.try_recv().unwrap(), msg);
    }

    #[test]
    fn filtered_subscriber_only_sees_matches() {
        let hub = MessageHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.subscribe(tx, MessageFilters::all().match_from("A"));

        assert_eq!(hub.publish(&Message::new("C", "B", "skip")), 0);
        assert_eq!(hub.publish(&Message::new("A", "B", "keep")), 1);
        assert_eq!(rx.try_recv().unwrap().body, "keep");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_by_channel_identity() {
        let hub = MessageHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.subscribe(tx1.clone(), MessageFilters::all());
        hub.subscribe(tx2, MessageFilters::all());

        hub.unsubscribe(&tx1);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(&Message::new("A", "B", "hi"));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let hub = MessageHub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.subscribe(tx, MessageFilters::all());
        drop(rx);

        assert_eq!(hub.publish(&Message::new("A", "B", "hi")), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn send_without_sink_is_unavailable() {
        let hub = MessageHub::new();
        let err = hub
            .send_message(Message::new("A", "B", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn send_forwards_to_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hub = MessageHub::new().with_outbound(tx);
        hub.send_message(Message::new("A", "B", "hi")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Message::new("A", "B", "hi"));
    }
}
