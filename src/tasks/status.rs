// Presence Tag — Status Indicator Task

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use presence_tag::config::*;
use presence_tag::{MotionMailbox, MotionState};

use crate::drivers::led::StatusLed;

pub fn status_task(mailbox: Arc<MotionMailbox>, mut led: StatusLed<'static>) {
    log::info!("Status task started");

    if let Err(e) = led.show(MotionState::NotMoving) {
        log::error!("Status LED error: {}", e);
    }

    let poll_interval = Duration::from_millis(STATUS_POLL_INTERVAL_MS);

    loop {
        if let Some(state) = mailbox.take() {
            if let Err(e) = led.show(state) {
                log::warn!("Status LED error: {}", e);
            }
        }
        thread::sleep(poll_interval);
    }
}
