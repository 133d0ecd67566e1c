//! Joystick and button sampling.
//!
//! Turns raw converter counts and pin levels into the values the gamepad
//! report carries:
//!
//! ```text
//! raw (0..=4095) ──clamp──► delta = raw - 2048
//!                           |delta| < deadzone  → 0
//!                           otherwise           → clamp(delta, ±2048)
//!                           vertical axis       → negated
//! ```

use crate::config::{ControllerConfig, ADC_MAX};

/// Physical buttons on the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// USE → gamepad A.
    Use,
    /// DASH → gamepad B.
    Dash,
    /// SEL → gamepad Select.
    Select,
}

impl Button {
    /// All buttons, in pin-table order.
    pub const ALL: [Button; 3] = [Button::Use, Button::Dash, Button::Select];

    /// Bit this button sets in the gamepad report.
    pub const fn gamepad_bit(self) -> u8 {
        match self {
            Button::Use => 1,
            Button::Dash => 2,
            Button::Select => 8,
        }
    }

    /// Position in [`Button::ALL`] and in `ControllerConfig::button_pins`.
    pub const fn index(self) -> usize {
        match self {
            Button::Use => 0,
            Button::Dash => 1,
            Button::Select => 2,
        }
    }
}

/// Joystick axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// DIR_H → left stick X.
    LeftX,
    /// DIR_V → left stick Y (inverted).
    LeftY,
}

impl Axis {
    pub const fn inverted(self) -> bool {
        matches!(self, Axis::LeftY)
    }
}

/// Bitwise OR of the gamepad bits of every pressed button.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonMask(u8);

impl ButtonMask {
    pub const NONE: Self = Self(0);

    pub fn from_pressed(pressed: [bool; 3]) -> Self {
        let bits = Button::ALL
            .iter()
            .filter(|b| pressed[b.index()])
            .fold(0u8, |acc, b| acc | b.gamepad_bit());
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & button.gamepad_bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// GPIO lines of the pressed buttons, one bit per pin number.
    pub fn gpio_lines(self, pins: &[u8; 3]) -> u32 {
        Button::ALL
            .iter()
            .filter(|b| self.is_pressed(**b))
            .fold(0u32, |acc, b| {
                acc | 1u32.checked_shl(u32::from(pins[b.index()])).unwrap_or(0)
            })
    }
}

/// Electrical level of a button line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineLevel {
    Low,
    High,
}

impl LineLevel {
    /// Level a pressed button drives its line to.
    pub const fn pressed(active_low: bool) -> Self {
        if active_low {
            LineLevel::Low
        } else {
            LineLevel::High
        }
    }

    /// Level the pull resistor holds a released line at.
    pub const fn released(active_low: bool) -> Self {
        if active_low {
            LineLevel::High
        } else {
            LineLevel::Low
        }
    }
}

/// Normalized stick position.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisSample {
    pub horizontal: i16,
    pub vertical: i16,
}

impl AxisSample {
    pub const CENTER: Self = Self {
        horizontal: 0,
        vertical: 0,
    };

    pub fn get(&self, axis: Axis) -> i16 {
        match axis {
            Axis::LeftX => self.horizontal,
            Axis::LeftY => self.vertical,
        }
    }
}

/// One tick's worth of raw hardware reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawInputs {
    /// Horizontal joystick converter count.
    pub horizontal: u16,
    /// Vertical joystick converter count.
    pub vertical: u16,
    /// Pin level (`true` = high) of each button, in `[USE, DASH, SEL]` order.
    pub button_levels: [bool; 3],
    /// USB 5 V present on the sense pin.
    pub usb_powered: bool,
}

impl RawInputs {
    /// Stick centered, nothing pressed, for the given button polarity.
    pub const fn idle(active_low: bool) -> Self {
        Self {
            horizontal: 2048,
            vertical: 2048,
            button_levels: [active_low; 3],
            usb_powered: false,
        }
    }
}

/// Converts raw reads into an [`AxisSample`] and a [`ButtonMask`].
#[derive(Clone, Copy, Debug)]
pub struct InputSampler {
    center: i32,
    deadzone: i32,
    max_range: i32,
    active_low: bool,
}

impl InputSampler {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            center: config.joystick_center,
            deadzone: config.joystick_deadzone,
            max_range: config.joystick_max_range,
            active_low: config.buttons_active_low,
        }
    }

    pub fn sample(&self, raw: &RawInputs) -> (AxisSample, ButtonMask) {
        let axes = AxisSample {
            horizontal: self.normalize(raw.horizontal, Axis::LeftX),
            vertical: self.normalize(raw.vertical, Axis::LeftY),
        };
        let pressed = raw.button_levels.map(|high| high != self.active_low);
        (axes, ButtonMask::from_pressed(pressed))
    }

    /// Deadzone, centering and clamping for a single axis.
    pub fn normalize(&self, raw: u16, axis: Axis) -> i16 {
        let raw = i32::from(raw.min(ADC_MAX));
        let delta = raw - self.center;
        if delta.abs() < self.deadzone {
            return 0;
        }
        let value = delta.clamp(-self.max_range, self.max_range);
        let value = if axis.inverted() { -value } else { value };
        // max_range is at most a 12-bit span, so this never saturates in practice.
        value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
    }
}
