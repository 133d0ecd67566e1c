//! USB HID gamepad report.
//!
//! Layout (5 bytes):
//! ```text
//! Byte 0:   Button bitfield
//!           Bit 0 = A (USE), Bit 1 = B (DASH), Bit 3 = Select (SEL)
//! Byte 1-2: X axis (i16 little-endian, -2048..2048)
//! Byte 3-4: Y axis (i16 little-endian, -2048..2048, up is negative)
//! ```

use crate::input::{AxisSample, ButtonMask};

/// Gamepad report size in bytes.
pub const GAMEPAD_REPORT_SIZE: usize = 5;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    /// Button bitfield (1 = A, 2 = B, 8 = Select).
    pub buttons: u8,
    pub x: i16,
    pub y: i16,
}

impl GamepadReport {
    pub fn new(axes: AxisSample, buttons: ButtonMask) -> Self {
        Self {
            buttons: buttons.bits(),
            x: axes.horizontal,
            y: axes.vertical,
        }
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (5, or 0 if `buf` is too small).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < GAMEPAD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.buttons;
        buf[1..3].copy_from_slice(&self.x.to_le_bytes());
        buf[3..5].copy_from_slice(&self.y.to_le_bytes());
        GAMEPAD_REPORT_SIZE
    }

    /// Returns `true` when no buttons are pressed and the stick is centered.
    pub fn is_idle(&self) -> bool {
        self.buttons == 0 && self.x == 0 && self.y == 0
    }
}

/// USB HID Report Descriptor for a 4-button gamepad with one 12-bit stick.
///
/// Only buttons 1, 2 and 4 are wired; button 3 is declared so that Select
/// keeps its bit position 3.
pub const GAMEPAD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    //
    //   - Buttons (4 bits + 4 padding) -
    0x05, 0x09, //   Usage Page (Buttons)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x04, //   Usage Maximum (Button 4)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x04, //   Report Count (4)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x04, //   Report Size (4)
    0x81, 0x01, //   Input (Constant) - padding
    //
    //   - X, Y -
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x16, 0x00, 0xF8, //     Logical Minimum (-2048)
    0x26, 0x00, 0x08, //     Logical Maximum (2048)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection (Physical)
    //
    0xC0, // End Collection (Application)
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_layout() {
        let report = GamepadReport {
            buttons: 1 | 8,
            x: 2047,
            y: -2048,
        };
        let mut buf = [0u8; 8];
        assert_eq!(report.serialize(&mut buf), 5);
        assert_eq!(&buf[..5], &[0x09, 0xFF, 0x07, 0x00, 0xF8]);
    }

    #[test]
    fn serialize_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(GamepadReport::default().serialize(&mut buf), 0);
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn built_from_sample() {
        let axes = AxisSample {
            horizontal: -300,
            vertical: 150,
        };
        let buttons = ButtonMask::from_pressed([false, true, false]);
        let report = GamepadReport::new(axes, buttons);
        assert_eq!(report.buttons, 2);
        assert_eq!(report.x, -300);
        assert_eq!(report.y, 150);
        assert!(!report.is_idle());
        assert!(GamepadReport::default().is_idle());
    }

    #[test]
    fn descriptor_collections_are_balanced() {
        let opens = GAMEPAD_REPORT_DESCRIPTOR
            .windows(2)
            .filter(|w| w[0] == 0xA1)
            .count();
        let closes = GAMEPAD_REPORT_DESCRIPTOR.iter().filter(|&&b| b == 0xC0).count();
        assert_eq!(opens, 2);
        assert_eq!(closes, 2);
    }
}
