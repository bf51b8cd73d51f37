use std::fmt::Debug;

use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::{Actor, ActorDeadError};

/// Object-safe form of [`Message`], so messages of different types can
/// share one queue.
pub trait BoxMessage<S>: Send + Debug + 'static {
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

/// The message that an actor can handle.
pub trait Message<S>: BoxMessage<S> {
    /// Handles the message with mutable access to the actor's state.
    ///
    /// The handler runs on the actor's task and must not block. Long
    /// running work should be spawned, reporting back with another
    /// message sent through `handle`.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> BoxMessage<S> for M {
    #[inline]
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

impl<S, M: Message<S> + ?Sized> Message<S> for Box<M> {
    #[inline]
    fn handle(self, state: &mut S, handle: &Actor<S>) {
        self.handle_box(state, handle)
    }
}

type BoxedMessage<S> = Box<dyn Message<S>>;

/// The sending half, shared by all handles of an actor.
pub struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxedMessage<S>>,
    killed_tx: watch::Sender<bool>,
}

/// The receiving half, owned by the actor's task.
pub struct Inbox<S> {
    msg_rx: mpsc::UnboundedReceiver<BoxedMessage<S>>,
    killed_rx: watch::Receiver<bool>,
}

impl<S: Send + Sync + 'static> Mailbox<S> {
    pub fn new() -> (Mailbox<S>, Inbox<S>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (killed_tx, killed_rx) = watch::channel(false);
        (Mailbox { msg_tx, killed_tx }, Inbox { msg_rx, killed_rx })
    }

    #[inline]
    pub fn send(&self, msg: BoxedMessage<S>) -> Result<(), ActorDeadError> {
        if *self.killed_tx.borrow() {
            return Err(ActorDeadError);
        }
        self.msg_tx.send(msg).map_err(|_| ActorDeadError)
    }

    #[inline]
    pub fn try_kill(&self) {
        self.killed_tx.send_replace(true);
    }
}

impl<S> Inbox<S> {
    /// Waits for the next message.
    ///
    /// Returns `None` once the actor is killed or every sender is gone.
    /// A kill wins over messages that are already queued.
    pub async fn next(&mut self) -> Option<BoxedMessage<S>> {
        if *self.killed_rx.borrow_and_update() {
            return None;
        }
        select! {
            biased;

            _ = self.killed_rx.changed() => None,
            msg = self.msg_rx.recv() => msg,
        }
    }

    /// Refuses further sends and drops whatever is still queued. Returns
    /// the number of dropped messages.
    pub fn close(&mut self) -> usize {
        self.msg_rx.close();
        let mut dropped = 0;
        while self.msg_rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
