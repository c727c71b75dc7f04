use std::{future::Future, sync::Arc};

use {
    parley_channels::{
        MessageFilters, MessageSender, MessageService, MessageSubscriber, reply_message,
    },
    parley_common::Message,
    tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::{debug, error},
};

use crate::{Command, CommandError};

/// Reply sent when no command understood the message.
pub const NOT_MATCHED_REPLY: &str = "Sorry! I'm not sure what you mean.";

/// Turn a dispatch error into the text sent back to the user.
pub fn error_message(err: &CommandError) -> String {
    match err {
        CommandError::Failed(e) if !err.is_not_matched() => {
            format!("Sorry, an error occurred: {e:#}")
        },
        _ => NOT_MATCHED_REPLY.to_string(),
    }
}

/// Upper bound on dispatch units running at once.
///
/// The default is unbounded: every inbound message gets its own task
/// immediately. A bounded limit makes the receive loop wait for a free slot
/// before spawning.
#[derive(Clone, Debug, Default)]
pub struct DispatchLimit(Option<Arc<Semaphore>>);

impl DispatchLimit {
    pub fn unbounded() -> Self {
        Self(None)
    }

    /// At most `max` concurrent units. `0` means unbounded.
    pub fn bounded(max: usize) -> Self {
        if max == 0 {
            return Self(None);
        }
        Self(Some(Arc::new(Semaphore::new(max))))
    }

    pub fn from_config(max: Option<usize>) -> Self {
        max.map_or_else(Self::unbounded, Self::bounded)
    }

    /// Wait for a free slot. Unbounded limits return immediately with `None`.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match self.0 {
            Some(ref sem) => Arc::clone(sem).acquire_owned().await.ok(),
            None => None,
        }
    }
}

impl Command {
    /// Run the command and, if it fails, reply to `msg` with the error text.
    ///
    /// A failed reply is logged and otherwise ignored.
    pub async fn execute_and_reply<S>(&self, cancel: CancellationToken, sender: &S, msg: Message)
    where
        S: MessageSender + ?Sized,
    {
        let Err(err) = self.execute(cancel, msg.clone().into()).await else {
            return;
        };

        debug!(from = %msg.from, to = %msg.to, error = %err, "command dispatch failed");
        let body = error_message(&err);
        if let Err(reply_err) = reply_message(sender, &msg, &body).await {
            error!(
                from = %msg.from,
                to = %msg.to,
                dispatch_error = %err,
                reply_error = %reply_err,
                "cannot reply with error message"
            );
        }
    }

    /// Dispatch every inbound message of `service` until `cancel` fires.
    ///
    /// Each message is handled on its own task; completion order is not
    /// preserved. On cancellation the loop unsubscribes and waits for all the
    /// tasks it spawned.
    pub async fn run_loop(&self, cancel: CancellationToken, service: Arc<dyn MessageService>) {
        self.run_loop_with_limit(cancel, service, DispatchLimit::unbounded())
            .await;
    }

    pub async fn run_loop_with_limit(
        &self,
        cancel: CancellationToken,
        service: Arc<dyn MessageService>,
        limit: DispatchLimit,
    ) {
        fan_out(&cancel, service.as_ref(), &limit, |msg| {
            let command = self.clone();
            let service = Arc::clone(&service);
            let cancel = cancel.clone();
            async move {
                command
                    .execute_and_reply(cancel, service.as_ref(), msg)
                    .await;
            }
        })
        .await;
        debug!("command loop stopped");
    }
}

/// Run `handle` on its own task for every message `subscriber` delivers,
/// until `cancel` fires.
///
/// The subscription is unfiltered. Before returning, the subscription is
/// dropped and every task spawned here has finished.
pub async fn fan_out<S, F, Fut>(
    cancel: &CancellationToken,
    subscriber: &S,
    limit: &DispatchLimit,
    handle: F,
) where
    S: MessageSubscriber + ?Sized,
    F: Fn(Message) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    subscriber.subscribe(tx.clone(), MessageFilters::all());

    let tracker = TaskTracker::new();
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = limit.acquire() => permit,
        };

        let unit = handle(msg);
        tracker.spawn(async move {
            let _permit = permit;
            unit.await;
        });
    }

    subscriber.unsubscribe(&tx);
    tracker.close();
    tracker.wait().await;
}
