// Presence Tag — Status LED
//
// Simple GPIO-driven indicator, lit while the tag is moving.

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use presence_tag::MotionState;

pub struct StatusLed<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> StatusLed<'d> {
    pub fn new(pin: PinDriver<'d, AnyOutputPin, Output>) -> Self {
        Self { pin }
    }

    pub fn show(&mut self, state: MotionState) -> anyhow::Result<()> {
        if state.is_moving() {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        Ok(())
    }
}
