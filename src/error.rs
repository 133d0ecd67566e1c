//! Error types for unrailed-pad.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.
//!
//! The control loop itself has no recoverable errors: sensor anomalies are
//! clamped where they are read. What remains is configuration that cannot
//! work, caught once at startup, and transport failures on the target.

use core::fmt;

/// Configuration that the firmware refuses to start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Battery minimum voltage is not below the maximum.
    BatteryVoltageRange,
    /// Voltage divider ratio is zero, negative or NaN.
    DividerRatio,
    /// Low-battery threshold outside 0..=100 %.
    LowBatteryThreshold,
    /// Deadzone is negative or swallows the whole stick range.
    Deadzone,
    /// A button pin does not fit in a 32-bit GPIO mask.
    ButtonPin,
    /// Wake mask does not match the button pins.
    WakeMask,
    /// A timing interval is zero.
    ZeroInterval,
    /// Idle warning window is not shorter than the sleep timeout.
    IdleWarningWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::BatteryVoltageRange => "battery min voltage must be below max voltage",
            ConfigError::DividerRatio => "voltage divider ratio must be positive",
            ConfigError::LowBatteryThreshold => "low battery threshold must be within 0..=100",
            ConfigError::Deadzone => "joystick deadzone must be within 0..max range",
            ConfigError::ButtonPin => "button pin number out of range",
            ConfigError::WakeMask => "wake mask does not match button pins",
            ConfigError::ZeroInterval => "timing intervals must be non-zero",
            ConfigError::IdleWarningWindow => "idle warning window must be shorter than sleep timeout",
        };
        f.write_str(msg)
    }
}

/// Top-level error type used by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Startup configuration check failed.
    Config(ConfigError),

    // USB
    /// USB endpoint is not ready (host not configured or suspended).
    UsbDisabled,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "invalid configuration: {e}"),
            Error::UsbDisabled => f.write_str("usb endpoint disabled"),
            Error::BufferOverflow => f.write_str("buffer too small"),
        }
    }
}

// Convenience conversions

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}
