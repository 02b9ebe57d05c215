// Presence Tag — Firmware Entry Point
//
// Boot sequence:
//   1. Bring up the I2C bus and probe the IMU (WHO_AM_I).
//   2. Configure the IMU (±2 g, ±250 °/s).
//   3. Calibrate accel/gyro bias with the tag resting flat.  Any failure here
//      aborts boot before motion detection starts.
//   4. Build the fusion context and wire its transitions to one mailbox per
//      consumer.
//   5. Spawn fusion, notify and status tasks.
//
// Built for the host, the binary replays a scripted still/shake/still trace
// through the same pipeline instead.

#[cfg(target_os = "espidf")]
mod drivers;
#[cfg(target_os = "espidf")]
mod tasks;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use anyhow::Context;
    use esp_idf_hal::gpio::{OutputPin, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;

    use presence_tag::config::*;
    use presence_tag::notify::LogNotifier;
    use presence_tag::{calibrate, FusionConfig, FusionContext, MotionMailbox};

    use crate::drivers::imu::Mpu6500;
    use crate::drivers::led::StatusLed;

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("Presence tag firmware starting…");

    let config = FusionConfig::default();
    config.validate()?;

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;

    // ---- I2C bus + IMU ----------------------------------------------------
    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21, // SDA
        peripherals.pins.gpio22, // SCL
        &i2c_config,
    )?;

    let mut imu = Mpu6500::new(i2c);
    let who_am_i = imu.probe().context("IMU not detected")?;
    log::info!("IMU detected (WHO_AM_I 0x{:02X})", who_am_i);
    imu.init()?;

    // ---- Calibration (blocks ~1000 reads, halts boot on failure) -----------
    let offsets = match calibrate(&mut imu, config.calibration_samples)
        .and_then(|offsets| offsets.verify_at_rest().map(|()| offsets))
    {
        Ok(offsets) => offsets,
        Err(e) => {
            log::error!("IMU calibration failed — not starting motion detection: {:#}", e);
            return Err(e);
        }
    };

    // ---- Fusion context & mailboxes ----------------------------------------
    let mut ctx = FusionContext::new(&config, offsets)?;
    let notify_mailbox = Arc::new(MotionMailbox::new());
    let status_mailbox = Arc::new(MotionMailbox::new());
    ctx.subscribe(notify_mailbox.subscriber());
    ctx.subscribe(status_mailbox.subscriber());

    let led = StatusLed::new(PinDriver::output(peripherals.pins.gpio2.downgrade_output())?);

    // ---- Spawn tasks (map to FreeRTOS tasks via std::thread) ---------------

    // Fusion task: tightest timing, sole owner of the IMU and fusion state.
    thread::Builder::new()
        .name("fusion".into())
        .stack_size(STACK_FUSION)
        .spawn(move || {
            tasks::fusion::fusion_task(imu, ctx);
        })?;

    // Wireless notification boundary
    thread::Builder::new()
        .name("notify".into())
        .stack_size(STACK_NOTIFY)
        .spawn(move || {
            tasks::notify::notify_task(notify_mailbox, LogNotifier::default());
        })?;

    // Local indicator
    thread::Builder::new()
        .name("status".into())
        .stack_size(STACK_STATUS)
        .spawn(move || {
            tasks::status::status_task(status_mailbox, led);
        })?;

    log::info!("Boot complete — motion detection running");

    // Main thread has nothing left to do, park it forever.
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use presence_tag::config::*;
    use presence_tag::sensor::{RawFrame, ReplaySensor};
    use presence_tag::{calibrate, Axes, FusionConfig, FusionContext};

    presence_tag::host_log::init(log::LevelFilter::Info)?;

    let config = FusionConfig::default();
    config.validate()?;

    // A slightly biased sensor: resting, carried (alternating jolts), resting.
    let gyro_bias = Axes::new(0.4, -0.3, 0.1);
    let rest = RawFrame::from_units(Axes::new(0.01, -0.02, 1.01), gyro_bias);
    let jolt = |x: f32| RawFrame::from_units(Axes::new(0.01 + x, -0.02, 1.01), gyro_bias);

    let mut frames = vec![rest; config.calibration_samples + 400];
    frames.extend((0..400).map(|i| jolt(if i % 2 == 0 { 0.8 } else { -0.8 })));
    frames.extend(std::iter::repeat(rest).take(600));

    let mut imu = ReplaySensor::new(frames);
    let offsets = calibrate(&mut imu, config.calibration_samples)?;
    offsets.verify_at_rest()?;
    let mut ctx = FusionContext::new(&config, offsets)?;

    let dt = FUSION_PERIOD_MS as f32 / 1000.0;
    let mut frame = 0u32;
    while !imu.is_exhausted() {
        if let Some(out) = ctx.tick(&mut imu, dt) {
            if let Some(state) = out.transition {
                println!(
                    "t={:.3}s {} (avg {:.3} g, payload {:?})",
                    frame as f32 * dt,
                    state.label(),
                    out.average,
                    state.notify_payload()[0] as char
                );
            }
        }
        frame += 1;
    }

    println!("replay finished: {:?}", ctx.stats());
    Ok(())
}
