//! USB Device subsystem - presents a HID gamepad to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb` with a single HID interface carrying
//! [`unrailed_pad::hid::GamepadReport`]s.
//!
//! The control loop pushes one report per tick into a channel; the writer
//! task forwards them to the interrupt endpoint. Nothing is pushed while
//! the controller sleeps.

pub mod hid_device;
