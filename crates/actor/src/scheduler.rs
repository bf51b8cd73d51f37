use std::sync::Weak;

use crate::{Actor, Message};
use crate::mailbox::{Inbox, Mailbox};

pub async fn run_actor<S: Send + Sync + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut inbox: Inbox<S>,
) {
    debug!("started");
    let mut handled = 0u64;
    while let Some(msg) = inbox.next().await {
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            warn!("last handle has been dropped, discard the message");
            break;
        };
        trace_span!("proc msg", seq = handled).in_scope(|| {
            msg.handle(&mut state, &Actor::from_mailbox(mailbox));
        });
        handled += 1;
    }

    let dropped = inbox.close();
    debug!(handled, dropped, "will terminate");
}
