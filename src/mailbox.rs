// Presence Tag — Single-slot Motion Mailbox
//
// Capacity one, latest value wins.  The fusion task overwrites; a consumer
// takes whatever is newest.  Intermediate values a slow reader misses are
// simply gone, there is no queue and no back-pressure.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::events::MotionState;

const EMPTY: u8 = u8::MAX;

#[derive(Debug)]
pub struct MotionMailbox {
    slot: AtomicU8,
}

impl Default for MotionMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionMailbox {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(EMPTY),
        }
    }

    /// Overwrite the slot with `state`.
    pub fn post(&self, state: MotionState) {
        self.slot.store(state.as_flag(), Ordering::Release);
    }

    /// Empty the slot, returning the latest posted state if there was one.
    pub fn take(&self) -> Option<MotionState> {
        MotionState::from_flag(self.slot.swap(EMPTY, Ordering::AcqRel))
    }

    /// Put back a state that was taken but could not be delivered.  A newer
    /// post that landed in the meantime wins and `state` is dropped.
    pub fn restore(&self, state: MotionState) {
        let _ = self
            .slot
            .compare_exchange(EMPTY, state.as_flag(), Ordering::AcqRel, Ordering::Acquire);
    }

    /// Latest posted state without consuming it.
    pub fn peek(&self) -> Option<MotionState> {
        MotionState::from_flag(self.slot.load(Ordering::Acquire))
    }

    /// Transition listener that posts into this mailbox.
    pub fn subscriber(self: &Arc<Self>) -> impl FnMut(MotionState) + Send + 'static {
        let mailbox = Arc::clone(self);
        move |state| mailbox.post(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_empty() {
        let mailbox = MotionMailbox::new();
        assert_eq!(mailbox.peek(), None);
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn latest_value_wins() {
        let mailbox = MotionMailbox::new();
        mailbox.post(MotionState::Moving);
        mailbox.post(MotionState::NotMoving);
        mailbox.post(MotionState::Moving);
        assert_eq!(mailbox.peek(), Some(MotionState::Moving));
        assert_eq!(mailbox.take(), Some(MotionState::Moving));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn restore_refills_an_empty_slot() {
        let mailbox = MotionMailbox::new();
        mailbox.post(MotionState::Moving);
        let taken = mailbox.take().unwrap();
        mailbox.restore(taken);
        assert_eq!(mailbox.take(), Some(MotionState::Moving));
    }

    #[test]
    fn restore_never_overwrites_a_newer_post() {
        let mailbox = MotionMailbox::new();
        mailbox.post(MotionState::Moving);
        let taken = mailbox.take().unwrap();
        mailbox.post(MotionState::NotMoving);
        mailbox.restore(taken);
        assert_eq!(mailbox.take(), Some(MotionState::NotMoving));
    }

    #[test]
    fn subscriber_posts_into_shared_slot() {
        let mailbox = Arc::new(MotionMailbox::new());
        let mut listener = mailbox.subscriber();
        listener(MotionState::Moving);
        assert_eq!(mailbox.take(), Some(MotionState::Moving));
    }

    #[test]
    fn reader_on_another_thread_sees_final_value() {
        let mailbox = Arc::new(MotionMailbox::new());
        let writer = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                for i in 0..10_000 {
                    mailbox.post(MotionState::from(i % 2 == 0));
                }
                mailbox.post(MotionState::NotMoving);
            })
        };

        let mut seen = 0u32;
        while !writer.is_finished() {
            if mailbox.take().is_some() {
                seen += 1;
            }
        }
        writer.join().unwrap();

        // Whatever the reader missed, the last write is still there unless it
        // was already taken.
        match mailbox.take() {
            Some(state) => assert_eq!(state, MotionState::NotMoving),
            None => assert!(seen > 0),
        }
    }
}
