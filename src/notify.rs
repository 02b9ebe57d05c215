// Presence Tag — Motion Notification Boundary
//
// The wireless link is an external collaborator: anything that can deliver
// the one-byte movement flag implements `MotionNotifier`.

use crate::events::MotionState;
use crate::mailbox::MotionMailbox;

pub trait MotionNotifier {
    fn notify(&mut self, state: MotionState) -> anyhow::Result<()>;
}

/// Writes the notify payload to the log.  Stands in for the radio when no
/// wireless stack is linked.
#[derive(Debug, Default)]
pub struct LogNotifier {
    sent: u32,
}

impl LogNotifier {
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

impl MotionNotifier for LogNotifier {
    fn notify(&mut self, state: MotionState) -> anyhow::Result<()> {
        self.sent += 1;
        let payload = state.notify_payload();
        log::info!("notify #{}: {} ({:?})", self.sent, payload[0] as char, state);
        Ok(())
    }
}

/// Deliver the newest mailbox value, if any.  Returns the state that was sent.
///
/// On a notifier error the state goes back into the mailbox (unless a newer
/// one arrived) so the next call retries it.
pub fn deliver_latest<N: MotionNotifier + ?Sized>(
    mailbox: &MotionMailbox,
    notifier: &mut N,
) -> anyhow::Result<Option<MotionState>> {
    let Some(state) = mailbox.take() else {
        return Ok(None);
    };
    if let Err(e) = notifier.notify(state) {
        mailbox.restore(state);
        return Err(e);
    }
    Ok(Some(state))
}
