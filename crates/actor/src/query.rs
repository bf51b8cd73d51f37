use std::fmt::{self, Debug};

use tokio::sync::oneshot;

use crate::{Actor, ActorDeadError, Message};

/// A message that runs a closure against the state and sends the result
/// back to the caller.
pub(crate) struct Query<S, R> {
    f: Box<dyn FnOnce(&mut S) -> R + Send>,
    reply_tx: oneshot::Sender<R>,
}

impl<S, R> Debug for Query<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

impl<S: 'static, R: Send + 'static> Message<S> for Query<S, R> {
    #[inline]
    fn handle(self, state: &mut S, _handle: &Actor<S>) {
        // The caller may have given up waiting, that's fine.
        self.reply_tx.send((self.f)(state)).ok();
    }
}

impl<S: Send + Sync + 'static> Actor<S> {
    /// Runs `f` on the actor's task and returns its result.
    ///
    /// The closure observes the state after every message sent before
    /// this call has been handled.
    pub async fn query<R, F>(&self, f: F) -> Result<R, ActorDeadError>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Query {
            f: Box::new(f),
            reply_tx,
        })?;
        reply_rx.await.map_err(|_| ActorDeadError)
    }
}
