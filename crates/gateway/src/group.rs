use std::future::Future;

use {
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{Error, Result};

/// A set of tasks sharing one cancellation token.
///
/// The first task to fail cancels the token; its error becomes the group's
/// result. Errors from tasks that fail afterwards are logged and dropped.
pub struct TaskGroup {
    cancel: CancellationToken,
    tasks: JoinSet<Result<()>>,
}

impl TaskGroup {
    /// Start a group whose token is a child of `parent`: cancelling the
    /// parent stops the group, a failure inside the group does not cancel the
    /// parent.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tasks: JoinSet::new(),
        }
    }

    /// Token every task in the group should watch.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task and return the first error, if any.
    pub async fn wait(mut self) -> Result<()> {
        let mut first: Option<Error> = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined.map_err(Error::from).and_then(|res| res);
            let Err(err) = outcome else {
                continue;
            };
            if first.is_none() {
                warn!(error = %err, "supervised task failed, stopping the group");
                self.cancel.cancel();
                first = Some(err);
            } else {
                debug!(error = %err, "discarding error after cancellation");
            }
        }
        first.map_or(Ok(()), Err)
    }
}
