// Presence Tag — Fusion Task
//
// Owns the IMU and the fusion context.  Runs the movement detector every
// 5 ms; transitions leave the task only through the context's subscribers.

use std::thread;
use std::time::{Duration, Instant};

use presence_tag::config::*;
use presence_tag::{FusionContext, InertialSensor};

pub fn fusion_task<S: InertialSensor>(mut imu: S, mut ctx: FusionContext) {
    log::info!("Fusion task started");

    let period = Duration::from_millis(FUSION_PERIOD_MS);
    let mut last_processed = Instant::now();

    loop {
        let tick_start = Instant::now();

        // dt spans any skipped frames so the gyro integration stays honest.
        let dt = tick_start.duration_since(last_processed).as_secs_f32();
        if ctx.tick(&mut imu, dt).is_some() {
            last_processed = tick_start;
        }

        // Sleep for the remainder of the period to hold the loop rate.
        let elapsed = tick_start.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }
}
