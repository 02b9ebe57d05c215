// Presence Tag — Tracker-side Proximity Estimate
//
// The tracker smooths the tag's advertised RSSI and turns it into a rough
// distance with the log-distance path-loss model.

use crate::config::*;

/// Exponential moving average of RSSI; the first reading seeds it.
#[derive(Debug, Clone, Copy)]
pub struct RssiSmoother {
    alpha: f32,
    average: Option<f32>,
}

impl Default for RssiSmoother {
    fn default() -> Self {
        Self::new(RSSI_SMOOTHING_ALPHA)
    }
}

impl RssiSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, average: None }
    }

    pub fn update(&mut self, rssi: i32) -> f32 {
        let rssi = rssi as f32;
        let next = match self.average {
            None => rssi,
            Some(avg) => self.alpha * rssi + (1.0 - self.alpha) * avg,
        };
        self.average = Some(next);
        next
    }

    pub fn average(&self) -> Option<f32> {
        self.average
    }

    pub fn reset(&mut self) {
        self.average = None;
    }
}

/// Distance in metres for `rssi` given the 1 m reference power and path-loss exponent.
pub fn estimate_distance_meters(rssi: f32, tx_power: f32, path_loss_exponent: f32) -> f32 {
    10f32.powf((tx_power - rssi) / (10.0 * path_loss_exponent))
}

/// [`estimate_distance_meters`] with the calibrated defaults.
pub fn default_distance_meters(rssi: f32) -> f32 {
    estimate_distance_meters(rssi, TX_POWER_DBM, PATH_LOSS_EXPONENT)
}
