// Presence Tag — Notification Task
//
// Polls its mailbox and hands each new movement flag to the notifier.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use presence_tag::config::*;
use presence_tag::notify::{deliver_latest, MotionNotifier};
use presence_tag::MotionMailbox;

pub fn notify_task<N: MotionNotifier>(mailbox: Arc<MotionMailbox>, mut notifier: N) {
    log::info!("Notify task started");

    let poll_interval = Duration::from_millis(NOTIFY_POLL_INTERVAL_MS);

    loop {
        if let Err(e) = deliver_latest(&mailbox, &mut notifier) {
            // The state stays queued; the next poll sends it again.
            log::warn!("Motion notification failed: {:#}", e);
        }
        thread::sleep(poll_interval);
    }
}
