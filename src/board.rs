//! Hardware reads for the control loop.
//!
//! One SAADC scan covers both stick axes and the battery sense pin, so a
//! tick costs a single conversion burst. Buttons are read through the
//! `embedded-hal` pin traits.

use embassy_nrf::gpio::{Input, Level, Output};
use embassy_nrf::saadc::Saadc;
use embedded_hal::digital::InputPin;
use unrailed_pad::config::ADC_MAX;
use unrailed_pad::input::RawInputs;

/// SAADC full scale with gain 1/6 and the 0.6 V internal reference.
const SAADC_FULL_SCALE_VOLTS: f32 = 3.6;

/// Channel order of the SAADC scan.
const CH_HORIZONTAL: usize = 0;
const CH_VERTICAL: usize = 1;
const CH_BATTERY: usize = 2;

/// One tick's hardware snapshot.
pub struct Reading {
    pub inputs: RawInputs,
    /// Battery voltage at the sense pin (before the divider correction).
    pub battery_sense_volts: f32,
    /// Charger STAT pin is low while charging.
    pub charging: bool,
}

pub struct Board {
    saadc: Saadc<'static, 3>,
    buttons: [Input<'static>; 3],
    bat_stat: Input<'static>,
    usb_sense: Input<'static>,
    boost_en: Output<'static>,
}

impl Board {
    pub fn new(
        saadc: Saadc<'static, 3>,
        buttons: [Input<'static>; 3],
        bat_stat: Input<'static>,
        usb_sense: Input<'static>,
        boost_en: Output<'static>,
    ) -> Self {
        Self {
            saadc,
            buttons,
            bat_stat,
            usb_sense,
            boost_en,
        }
    }

    pub async fn calibrate(&mut self) {
        self.saadc.calibrate().await;
    }

    pub async fn read(&mut self) -> Reading {
        let mut buf = [0i16; 3];
        self.saadc.sample(&mut buf).await;

        Reading {
            inputs: RawInputs {
                horizontal: to_counts(buf[CH_HORIZONTAL]),
                vertical: to_counts(buf[CH_VERTICAL]),
                button_levels: pin_levels(&mut self.buttons),
                usb_powered: self.usb_sense.is_high(),
            },
            battery_sense_volts: to_volts(buf[CH_BATTERY]),
            charging: self.bat_stat.is_low(),
        }
    }

    /// Joystick pots hang off the boost rail.
    pub fn set_boost(&mut self, on: bool) {
        self.boost_en.set_level(if on { Level::High } else { Level::Low });
    }

    pub fn buttons(&mut self) -> &mut [Input<'static>; 3] {
        &mut self.buttons
    }
}

/// Pin levels in `[USE, DASH, SEL]` order (`true` = high).
pub fn pin_levels<P: InputPin>(pins: &mut [P; 3]) -> [bool; 3] {
    // A failed read reports the released level of an active-low button.
    [0, 1, 2].map(|i| pins[i].is_high().unwrap_or(true))
}

/// Single-ended readings can dip slightly below zero; clamp into 0..=4095.
fn to_counts(sample: i16) -> u16 {
    (sample.max(0) as u16).min(ADC_MAX)
}

fn to_volts(sample: i16) -> f32 {
    f32::from(to_counts(sample)) * SAADC_FULL_SCALE_VOLTS / f32::from(ADC_MAX + 1)
}
