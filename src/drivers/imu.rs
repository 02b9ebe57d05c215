// Presence Tag — MPU-6500/9250 IMU Driver
//
// Register-level driver over the I2C bus.  Only raw register access lives
// here; scaling and bias removal come from `InertialSensor`.

use anyhow::bail;
use esp_idf_hal::i2c::I2cDriver;

use presence_tag::config::*;
use presence_tag::sensor::{InertialSensor, SensorBlock};

// Register addresses
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_XOUT_H: u8 = 0x43;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;

/// MPU-6050, MPU-6500, MPU-9250, MPU-9255 share the accel/gyro register map.
const KNOWN_WHO_AM_I: [u8; 4] = [0x68, 0x70, 0x71, 0x73];

pub struct Mpu6500<'d> {
    i2c: I2cDriver<'d>,
}

impl<'d> Mpu6500<'d> {
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        Self { i2c }
    }

    /// Read WHO_AM_I and make sure a supported part answered.
    pub fn probe(&mut self) -> anyhow::Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDR_IMU, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS)?;
        if !KNOWN_WHO_AM_I.contains(&buf[0]) {
            bail!("unexpected WHO_AM_I 0x{:02X} at address 0x{:02X}", buf[0], I2C_ADDR_IMU);
        }
        Ok(buf[0])
    }

    /// Wake the sensor and configure accel (±2 g), gyro (±250 °/s), DLPF 44 Hz.
    pub fn init(&mut self) -> anyhow::Result<()> {
        // Wake up (clear SLEEP bit)
        self.write_reg(REG_PWR_MGMT_1, 0x00)?;

        // DLPF bandwidth 44 Hz, well under the 200 Hz loop rate
        self.write_reg(REG_CONFIG, 0x03)?;

        // Gyroscope: ±250 °/s
        self.write_reg(REG_GYRO_CONFIG, 0x00)?;

        // Accelerometer: ±2 g
        self.write_reg(REG_ACCEL_CONFIG, 0x00)?;

        log::info!("IMU initialised (±2g, ±250°/s, DLPF 44Hz)");
        Ok(())
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> anyhow::Result<()> {
        self.i2c.write(I2C_ADDR_IMU, &[reg, value], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }
}

impl InertialSensor for Mpu6500<'_> {
    fn read_raw(&mut self, block: SensorBlock) -> anyhow::Result<[i16; 3]> {
        let reg = match block {
            SensorBlock::Accel => REG_ACCEL_XOUT_H,
            SensorBlock::Gyro => REG_GYRO_XOUT_H,
        };
        let mut raw = [0u8; 6];
        self.i2c.write_read(I2C_ADDR_IMU, &[reg], &mut raw, I2C_TIMEOUT_TICKS)?;

        Ok([
            i16::from_be_bytes([raw[0], raw[1]]),
            i16::from_be_bytes([raw[2], raw[3]]),
            i16::from_be_bytes([raw[4], raw[5]]),
        ])
    }
}
