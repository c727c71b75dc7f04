use std::{future::Future, sync::Arc};

use {futures::future::BoxFuture, parley_common::Message, tokio_util::sync::CancellationToken};

use crate::{CommandError, Prefix, Result};

/// A message on its way through a command tree.
///
/// `body` starts as the original body and loses one matched prefix per level.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    pub original: Message,
    pub body: String,
}

impl From<Message> for CommandMessage {
    fn from(original: Message) -> Self {
        let body = original.body.clone();
        Self { original, body }
    }
}

/// What a [`Command`] does once its prefix matched.
///
/// Implemented for async closures taking `(CancellationToken, CommandMessage)`.
pub trait Action: Send + Sync {
    fn call(&self, cancel: CancellationToken, msg: CommandMessage) -> BoxFuture<'_, Result<()>>;
}

impl<F, Fut> Action for F
where
    F: Fn(CancellationToken, CommandMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, cancel: CancellationToken, msg: CommandMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin((self)(cancel, msg))
    }
}

/// A prefix bound to an action.
#[derive(Clone)]
pub struct Command {
    pub prefix: Prefix,
    pub action: Arc<dyn Action>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command").finish_non_exhaustive()
    }
}

impl Command {
    pub fn new(prefix: Prefix, action: impl Action + 'static) -> Self {
        Self {
            prefix,
            action: Arc::new(action),
        }
    }

    /// A command whose action tries `children` in order.
    pub fn group(prefix: Prefix, children: Vec<Command>) -> Self {
        Self::new(prefix, subcommands(children))
    }

    /// Run the command against `msg`.
    ///
    /// On a prefix match the body is replaced by the remainder and the action
    /// runs. Otherwise the result is [`CommandError::NotMatched`].
    pub async fn execute(&self, cancel: CancellationToken, mut msg: CommandMessage) -> Result<()> {
        let Some(rest) = self.prefix.matches(&msg.body) else {
            return Err(CommandError::NotMatched);
        };
        msg.body = rest.to_string();
        self.action.call(cancel, msg).await
    }
}

/// Action that tries a list of commands in order.
///
/// A child that did not match passes to the next one. Any other outcome,
/// success or failure, ends the search and is returned as is. When no child
/// matched the result is [`CommandError::NotMatched`].
#[derive(Clone, Debug)]
pub struct Subcommands(Arc<[Command]>);

/// Build a [`Subcommands`] action from `children`.
pub fn subcommands(children: Vec<Command>) -> Subcommands {
    Subcommands(children.into())
}

impl Action for Subcommands {
    fn call(&self, cancel: CancellationToken, msg: CommandMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            for child in self.0.iter() {
                match child.execute(cancel.clone(), msg.clone()).await {
                    Err(err) if err.is_not_matched() => continue,
                    outcome => return outcome,
                }
            }
            Err(CommandError::NotMatched)
        })
    }
}
