//! Status LED patterns.
//!
//! The LED task only needs a [`StatusSnapshot`]; this module maps it to a
//! pattern and answers "on or off at time t".

use crate::battery::BatteryLevel;
use crate::config::{LED_BLINK_INTERVAL_MS, LED_STARTUP_BLINKS};
use crate::power::PowerState;

/// What the indicator is told every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub state: PowerState,
    /// `None` until the first battery reading.
    pub battery: Option<BatteryLevel>,
    pub charging: bool,
    /// Running from USB bus power.
    pub usb_powered: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlinkPattern {
    Off,
    Solid,
    /// Symmetric blink, `half_period_ms` on then off.
    Blink { half_period_ms: u64 },
    /// Boot greeting: a fixed number of blinks, then off.
    Startup { blinks: u8, half_period_ms: u64 },
}

impl BlinkPattern {
    pub const STARTUP: Self = BlinkPattern::Startup {
        blinks: LED_STARTUP_BLINKS,
        half_period_ms: LED_BLINK_INTERVAL_MS,
    };

    pub fn for_status(status: &StatusSnapshot) -> Self {
        if status.state.is_sleeping() {
            return BlinkPattern::Off;
        }
        // On bus power the cell is being topped up; no low-battery alarm.
        if status.battery == Some(BatteryLevel::Low) && !status.usb_powered {
            return BlinkPattern::Blink {
                half_period_ms: LED_BLINK_INTERVAL_MS / 2,
            };
        }
        match status.state {
            PowerState::IdleWarning => BlinkPattern::Blink {
                half_period_ms: LED_BLINK_INTERVAL_MS,
            },
            _ if status.charging => BlinkPattern::Blink {
                half_period_ms: LED_BLINK_INTERVAL_MS * 2,
            },
            _ => BlinkPattern::Solid,
        }
    }

    /// LED level `elapsed_ms` after the pattern started.
    pub fn level_at(&self, elapsed_ms: u64) -> bool {
        match *self {
            BlinkPattern::Off => false,
            BlinkPattern::Solid => true,
            BlinkPattern::Blink { half_period_ms } => {
                half_period_ms == 0 || (elapsed_ms / half_period_ms) % 2 == 0
            }
            BlinkPattern::Startup {
                blinks,
                half_period_ms,
            } => {
                if half_period_ms == 0 {
                    return false;
                }
                let phase = elapsed_ms / half_period_ms;
                phase < u64::from(blinks) * 2 && phase % 2 == 0
            }
        }
    }

    /// Time after which the pattern no longer changes, if it ends.
    pub fn duration_ms(&self) -> Option<u64> {
        match *self {
            BlinkPattern::Startup {
                blinks,
                half_period_ms,
            } => Some(u64::from(blinks) * 2 * half_period_ms),
            BlinkPattern::Off | BlinkPattern::Solid => Some(0),
            BlinkPattern::Blink { .. } => None,
        }
    }
}
