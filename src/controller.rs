//! One control-loop step.
//!
//! The firmware calls [`Controller::tick`] at a fixed rate while awake and
//! [`Controller::wake`] after every return from a suspension. Hardware
//! reads are passed in, so the same sequence runs in host tests.

use crate::activity::ActivityTracker;
use crate::battery::{BatteryMonitor, BatteryReading};
use crate::config::ControllerConfig;
use crate::hid::GamepadReport;
use crate::indicator::StatusSnapshot;
use crate::input::{AxisSample, ButtonMask, InputSampler, RawInputs};
use crate::power::{PowerState, PowerStateMachine, SleepRequest, WakeOutcome, WakeReason};

/// Everything one tick produces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickOutput {
    /// Report to send; `None` while sleeping or when this tick enters sleep.
    pub report: Option<GamepadReport>,
    pub status: StatusSnapshot,
    /// Set on the tick that enters a sleep state.
    pub sleep: Option<SleepRequest>,
    /// Fresh battery reading, on ticks where one was taken.
    pub battery: Option<BatteryReading>,
    pub activity: bool,
}

pub struct Controller {
    config: ControllerConfig,
    sampler: InputSampler,
    battery: BatteryMonitor,
    activity: ActivityTracker,
    power: PowerStateMachine,
    previous_buttons: ButtonMask,
    last_axes: AxisSample,
    usb_powered: bool,
}

impl Controller {
    pub fn new(config: ControllerConfig, now_ms: u64) -> Self {
        Self {
            sampler: InputSampler::new(&config),
            battery: BatteryMonitor::new(&config),
            activity: ActivityTracker::new(&config, now_ms),
            power: PowerStateMachine::new(&config, now_ms),
            previous_buttons: ButtonMask::NONE,
            last_axes: AxisSample::CENTER,
            usb_powered: false,
            config,
        }
    }

    /// Controller for a chip that just came back from a sleep that reset it.
    /// Feed the wake reason to [`Controller::wake`] next.
    pub fn asleep(config: ControllerConfig, state: PowerState, now_ms: u64) -> Self {
        let mut controller = Self::new(config, now_ms);
        controller.power = PowerStateMachine::asleep(&controller.config, state, now_ms);
        controller
    }

    /// Sample, poll the battery, track activity, evaluate power state.
    ///
    /// `read_battery` returns `(sense_volts, charging)` and is only called
    /// when a battery sample is due.
    pub fn tick<F>(&mut self, raw: &RawInputs, read_battery: F, now_ms: u64) -> TickOutput
    where
        F: FnOnce() -> (f32, bool),
    {
        if self.power.state().is_sleeping() {
            return TickOutput {
                report: None,
                status: self.status(),
                sleep: None,
                battery: None,
                activity: false,
            };
        }

        if raw.usb_powered != self.usb_powered {
            info!("USB power: {=bool}", raw.usb_powered);
            self.usb_powered = raw.usb_powered;
        }

        let (axes, buttons) = self.sampler.sample(raw);
        let battery = self.battery.poll(now_ms, read_battery);
        let activity = self
            .activity
            .update(axes, buttons, self.previous_buttons, now_ms);
        self.previous_buttons = buttons;
        self.last_axes = axes;

        let idle_ms = self.activity.time_since_last_activity(now_ms);
        let sleep = self.power.evaluate(idle_ms, self.battery.is_low(), now_ms);

        let report = if sleep.is_none() && self.power.state().is_awake() {
            Some(GamepadReport::new(axes, buttons))
        } else {
            None
        };

        TickOutput {
            report,
            status: self.status(),
            sleep,
            battery,
            activity,
        }
    }

    /// Feed a wake event back after a suspension.
    ///
    /// A timer wake re-samples the battery through `read_battery` before
    /// deciding; a button wake never reads it.
    pub fn wake<F>(&mut self, reason: WakeReason, read_battery: F, now_ms: u64) -> WakeOutcome
    where
        F: FnOnce() -> (f32, bool),
    {
        let battery_low = match reason {
            WakeReason::Timer => self.battery.force(now_ms, read_battery).is_low(),
            WakeReason::Buttons { .. } => self.battery.is_low(),
        };

        let outcome = self.power.wake(reason, battery_low, now_ms);
        if outcome == WakeOutcome::Resumed {
            // Nothing from before the sleep carries over.
            self.activity.reset(now_ms);
            self.previous_buttons = ButtonMask::NONE;
            self.last_axes = AxisSample::CENTER;
        }
        outcome
    }

    /// Lines asserted by the buttons, for building a wake reason from a
    /// polled button mask.
    pub fn asserted_lines(&self, buttons: ButtonMask) -> u32 {
        buttons.gpio_lines(&self.config.button_pins)
    }

    pub fn status(&self) -> StatusSnapshot {
        let last = self.battery.last();
        StatusSnapshot {
            state: self.power.state(),
            battery: last.map(|r| r.level),
            charging: last.is_some_and(|r| r.charging),
            usb_powered: self.usb_powered,
        }
    }

    pub fn state(&self) -> PowerState {
        self.power.state()
    }

    /// What to arm while suspended; `None` while awake.
    pub fn sleep_request(&self) -> Option<SleepRequest> {
        self.power.sleep_request()
    }

    pub fn battery(&self) -> Option<BatteryReading> {
        self.battery.last()
    }

    pub fn last_axes(&self) -> AxisSample {
        self.last_axes
    }

    pub fn time_since_last_activity(&self, now_ms: u64) -> u64 {
        self.activity.time_since_last_activity(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::BlinkPattern;

    const HEALTHY: (f32, bool) = (2.0, false); // 4.0 V
    const FLAT: (f32, bool) = (1.55, false); // 3.1 V

    fn controller() -> Controller {
        Controller::new(ControllerConfig::DEFAULT, 0)
    }

    #[test]
    fn first_tick_reads_battery_and_reports() {
        let mut c = controller();
        let out = c.tick(&RawInputs::idle(true), || HEALTHY, 0);
        assert!(out.battery.is_some());
        assert_eq!(out.report, Some(GamepadReport::default()));
        assert_eq!(out.status.state, PowerState::Active);
    }

    #[test]
    fn battery_is_not_read_every_tick() {
        let mut c = controller();
        c.tick(&RawInputs::idle(true), || HEALTHY, 0);
        let out = c.tick(&RawInputs::idle(true), || panic!("not due"), 10);
        assert!(out.battery.is_none());
    }

    #[test]
    fn flat_battery_suppresses_report_on_sleep_tick() {
        let mut c = controller();
        let out = c.tick(&RawInputs::idle(true), || FLAT, 0);
        assert!(out.report.is_none());
        let req = out.sleep.expect("sleep request");
        assert_eq!(req.state, PowerState::LowBatterySleep);

        // Sleeping ticks produce nothing.
        let out = c.tick(&RawInputs::idle(true), || HEALTHY, 10);
        assert!(out.report.is_none());
        assert!(out.sleep.is_none());
    }

    #[test]
    fn usb_power_reaches_the_status() {
        let mut c = controller();
        let plugged = RawInputs {
            usb_powered: true,
            ..RawInputs::idle(true)
        };
        let out = c.tick(&plugged, || (1.6, true), 0);
        assert!(out.status.usb_powered);
        assert!(out.status.charging);
        assert_eq!(
            BlinkPattern::for_status(&out.status),
            BlinkPattern::Blink { half_period_ms: 1000 }
        );

        let out = c.tick(&RawInputs::idle(true), || HEALTHY, 10);
        assert!(!out.status.usb_powered);
    }

    #[test]
    fn low_battery_still_sleeps_on_usb_power() {
        let mut c = controller();
        let plugged = RawInputs {
            usb_powered: true,
            ..RawInputs::idle(true)
        };
        let out = c.tick(&plugged, || FLAT, 0);
        assert_eq!(out.sleep.map(|r| r.state), Some(PowerState::LowBatterySleep));
        assert!(out.status.usb_powered);
    }

    #[test]
    fn wake_clears_button_history() {
        let mut c = controller();
        let mut raw = RawInputs::idle(true);
        raw.button_levels = [false; 3];
        c.tick(&raw, || HEALTHY, 0);
        let out = c.tick(&RawInputs::idle(true), || HEALTHY, 300_000);
        assert!(out.activity, "release edge");

        let out = c.tick(&RawInputs::idle(true), || HEALTHY, 600_000);
        assert_eq!(out.status.state, PowerState::DeepSleep);

        let asserted = c.asserted_lines(ButtonMask::from_pressed([true; 3]));
        assert_eq!(
            c.wake(WakeReason::Buttons { asserted }, || panic!("no read"), 700_000),
            WakeOutcome::Resumed
        );
        assert_eq!(c.time_since_last_activity(700_000), 0);

        // Buttons still held after waking: the first tick sees a press edge.
        let out = c.tick(&raw, || HEALTHY, 700_010);
        assert!(out.activity);
        assert_eq!(out.report.map(|r| r.buttons), Some(1 | 2 | 8));
    }
}
