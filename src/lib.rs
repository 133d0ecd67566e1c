//! Input and power logic for the Unrailed handheld controller.
//!
//! Everything in this library is pure logic that runs on the host as well
//! as on the nRF52840: raw reads and monotonic timestamps go in, gamepad
//! reports, LED patterns and sleep requests come out.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and is only built with `--features embedded`.
//!
//! ## Components
//!
//! - [`input::InputSampler`] - joystick deadzone/centering, button mask
//! - [`battery::BatteryMonitor`] - sense voltage to percentage, 5 s cadence
//! - [`activity::ActivityTracker`] - inactivity timer
//! - [`power::PowerStateMachine`] - Active / IdleWarning / DeepSleep / LowBatterySleep
//! - [`controller::Controller`] - one control-loop step over all of the above

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod activity;
pub mod battery;
pub mod config;
pub mod controller;
pub mod error;
pub mod hid;
pub mod indicator;
pub mod input;
pub mod power;

pub use config::ControllerConfig;
pub use controller::{Controller, TickOutput};
pub use error::{ConfigError, Error};
pub use power::{PowerState, SleepRequest, WakeOutcome, WakeReason};
