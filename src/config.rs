//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.
//! [`ControllerConfig`] bundles the tunables the core logic consumes; the
//! firmware builds it once at startup and hands it to every component.

use crate::error::ConfigError;

// Identity

pub const HARDWARE_VERSION: &str = "nRF52840 handheld rev A";
pub const FIRMWARE_VERSION: &str = "1.0.0";

/// Name reported to the host as the USB product string.
pub const CONTROLLER_NAME: &str = "Unrailed Controller";
pub const MANUFACTURER: &str = "unrailed-pad";

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

// GPIO pin assignments (port 0)
//
// The button pins double as wake lines, so the wake mask below is built
// from these numbers.
//
//   Status LED       → P0.06  (LED_LV)
//   Battery status   → P0.09  (charger STAT, low while charging)
//   Battery sense    → AIN1 / P0.03  (100k/100k divider)
//   USB 5V sense     → P0.16
//   Boost enable     → P0.15
//   Joystick H       → AIN2 / P0.04
//   Joystick V       → AIN3 / P0.05
//   USE  (A)         → P0.21
//   DASH (B)         → P0.18
//   SEL  (Select)    → P0.17
//
// P0.18 doubles as pin reset; UICR.PSELRESET must stay unprogrammed.

pub const USE_PIN: u8 = 21;
pub const DASH_PIN: u8 = 18;
pub const SEL_PIN: u8 = 17;

/// GPIO lines that must all be asserted to wake from sleep.
pub const WAKE_BUTTON_BITMASK: u32 = (1 << USE_PIN) | (1 << DASH_PIN) | (1 << SEL_PIN);

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 20;

/// After a reset out of System OFF, how long the other wake buttons have
/// to join the one that tripped the wake.
pub const WAKE_COMBO_GRACE_MS: u64 = 500;

// Joystick

/// ADC units around center treated as zero.
pub const JOYSTICK_DEADZONE: i32 = 100;
/// 12-bit ADC center.
pub const JOYSTICK_CENTER: i32 = 2048;
/// Maximum deviation from center.
pub const JOYSTICK_MAX_RANGE: i32 = 2048;
/// Largest raw value a 12-bit converter can report.
pub const ADC_MAX: u16 = 4095;

// Battery

pub const BATTERY_CHECK_INTERVAL_MS: u64 = 5_000;
pub const BATTERY_MIN_VOLTAGE: f32 = 3.0;
/// Fully charged Li-Po.
pub const BATTERY_MAX_VOLTAGE: f32 = 4.2;
/// 100k/100k divider = 2:1.
pub const VOLTAGE_DIVIDER_RATIO: f32 = 2.0;
/// Percentage at or below which the battery counts as low.
pub const LOW_BATTERY_THRESHOLD: f32 = 15.0;

// LED

/// Blink half-period (ms).
pub const LED_BLINK_INTERVAL_MS: u64 = 500;
pub const LED_STARTUP_BLINKS: u8 = 3;

// Power management

/// Inactivity before deep sleep (5 minutes).
pub const SLEEP_TIMEOUT_MS: u64 = 300_000;
/// How long before the sleep timeout the idle warning starts.
pub const IDLE_WARNING_MS: u64 = 30_000;
/// Wake period while sleeping on a low battery.
pub const LOW_BATTERY_SLEEP_MS: u64 = 30_000;
/// Joystick movement threshold counted as activity.
pub const ACTIVITY_THRESHOLD: i32 = 50;

/// Control loop period (ms).
pub const CONTROL_TICK_MS: u64 = 10;

/// Tunables consumed by the input and power logic.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    pub joystick_center: i32,
    pub joystick_deadzone: i32,
    pub joystick_max_range: i32,
    /// Buttons read low when pressed (internal pull-ups).
    pub buttons_active_low: bool,

    pub battery_check_interval_ms: u64,
    pub battery_min_voltage: f32,
    pub battery_max_voltage: f32,
    pub voltage_divider_ratio: f32,
    pub low_battery_threshold: f32,

    pub activity_threshold: i32,
    pub sleep_timeout_ms: u64,
    pub idle_warning_ms: u64,
    pub low_battery_sleep_ms: u64,

    /// Button pins in `[USE, DASH, SEL]` order.
    pub button_pins: [u8; 3],
    pub wake_mask: u32,
}

impl ControllerConfig {
    pub const DEFAULT: Self = Self {
        joystick_center: JOYSTICK_CENTER,
        joystick_deadzone: JOYSTICK_DEADZONE,
        joystick_max_range: JOYSTICK_MAX_RANGE,
        buttons_active_low: true,

        battery_check_interval_ms: BATTERY_CHECK_INTERVAL_MS,
        battery_min_voltage: BATTERY_MIN_VOLTAGE,
        battery_max_voltage: BATTERY_MAX_VOLTAGE,
        voltage_divider_ratio: VOLTAGE_DIVIDER_RATIO,
        low_battery_threshold: LOW_BATTERY_THRESHOLD,

        activity_threshold: ACTIVITY_THRESHOLD,
        sleep_timeout_ms: SLEEP_TIMEOUT_MS,
        idle_warning_ms: IDLE_WARNING_MS,
        low_battery_sleep_ms: LOW_BATTERY_SLEEP_MS,

        button_pins: [USE_PIN, DASH_PIN, SEL_PIN],
        wake_mask: WAKE_BUTTON_BITMASK,
    };

    /// Mask built from `button_pins`, one bit per GPIO line.
    pub fn pin_mask(&self) -> u32 {
        self.button_pins
            .iter()
            .fold(0u32, |mask, &pin| mask | 1u32.checked_shl(u32::from(pin)).unwrap_or(0))
    }

    /// Startup sanity check. The firmware refuses to run on `Err`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.battery_min_voltage < self.battery_max_voltage) {
            return Err(ConfigError::BatteryVoltageRange);
        }
        if !(self.voltage_divider_ratio > 0.0) {
            return Err(ConfigError::DividerRatio);
        }
        if !(0.0..=100.0).contains(&self.low_battery_threshold) {
            return Err(ConfigError::LowBatteryThreshold);
        }
        if self.joystick_max_range <= 0
            || self.joystick_deadzone < 0
            || self.joystick_deadzone >= self.joystick_max_range
        {
            return Err(ConfigError::Deadzone);
        }
        if self.button_pins.iter().any(|&pin| pin >= 32) {
            return Err(ConfigError::ButtonPin);
        }
        if self.wake_mask == 0 || self.wake_mask != self.pin_mask() {
            return Err(ConfigError::WakeMask);
        }
        if self.battery_check_interval_ms == 0
            || self.sleep_timeout_ms == 0
            || self.low_battery_sleep_ms == 0
        {
            return Err(ConfigError::ZeroInterval);
        }
        if self.idle_warning_ms >= self.sleep_timeout_ms {
            return Err(ConfigError::IdleWarningWindow);
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn wake_mask_covers_the_three_button_lines() {
        assert_eq!(WAKE_BUTTON_BITMASK, 0x0026_0000);
        assert_eq!(ControllerConfig::DEFAULT.pin_mask(), WAKE_BUTTON_BITMASK);
    }

    #[test]
    fn inverted_battery_range_is_rejected() {
        let cfg = ControllerConfig {
            battery_min_voltage: 4.2,
            battery_max_voltage: 3.0,
            ..ControllerConfig::DEFAULT
        };
        assert_eq!(cfg.validate(), Err(ConfigError::BatteryVoltageRange));

        let cfg = ControllerConfig {
            battery_min_voltage: 3.7,
            battery_max_voltage: 3.7,
            ..ControllerConfig::DEFAULT
        };
        assert_eq!(cfg.validate(), Err(ConfigError::BatteryVoltageRange));
    }

    #[test]
    fn wake_mask_must_match_button_pins() {
        // Bit 19 instead of bit 18.
        let cfg = ControllerConfig {
            wake_mask: 0x002A_0000,
            ..ControllerConfig::DEFAULT
        };
        assert_eq!(cfg.validate(), Err(ConfigError::WakeMask));
    }

    #[test]
    fn other_bad_values_are_rejected() {
        let d = ControllerConfig::DEFAULT;
        assert_eq!(
            ControllerConfig { voltage_divider_ratio: 0.0, ..d }.validate(),
            Err(ConfigError::DividerRatio)
        );
        assert_eq!(
            ControllerConfig { low_battery_threshold: 101.0, ..d }.validate(),
            Err(ConfigError::LowBatteryThreshold)
        );
        assert_eq!(
            ControllerConfig { joystick_deadzone: 2048, ..d }.validate(),
            Err(ConfigError::Deadzone)
        );
        assert_eq!(
            ControllerConfig { button_pins: [21, 18, 40], ..d }.validate(),
            Err(ConfigError::ButtonPin)
        );
        assert_eq!(
            ControllerConfig { battery_check_interval_ms: 0, ..d }.validate(),
            Err(ConfigError::ZeroInterval)
        );
        assert_eq!(
            ControllerConfig { idle_warning_ms: SLEEP_TIMEOUT_MS, ..d }.validate(),
            Err(ConfigError::IdleWarningWindow)
        );
    }
}
