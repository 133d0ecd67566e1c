//! Inactivity tracking.
//!
//! Stick deflection past the activity threshold or any button edge counts
//! as the user being present. Everything else is measured as elapsed time
//! since the last such event.

use crate::config::ControllerConfig;
use crate::input::{AxisSample, ButtonMask};

#[derive(Clone, Debug)]
pub struct ActivityTracker {
    threshold: i32,
    timeout_ms: u64,
    last_activity_ms: u64,
}

impl ActivityTracker {
    /// Start tracking with `now_ms` as the last activity.
    pub fn new(config: &ControllerConfig, now_ms: u64) -> Self {
        Self {
            threshold: config.activity_threshold,
            timeout_ms: config.sleep_timeout_ms,
            last_activity_ms: now_ms,
        }
    }

    /// Feed one sample. Returns `true` and restarts the inactivity timer
    /// when the sample counts as activity.
    pub fn update(
        &mut self,
        axes: AxisSample,
        buttons: ButtonMask,
        previous_buttons: ButtonMask,
        now_ms: u64,
    ) -> bool {
        let moved = i32::from(axes.horizontal).abs() >= self.threshold
            || i32::from(axes.vertical).abs() >= self.threshold;
        let detected = moved || buttons != previous_buttons;
        if detected {
            self.last_activity_ms = now_ms;
        }
        detected
    }

    pub fn time_since_last_activity(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_ms)
    }

    /// Still within the inactivity timeout.
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.time_since_last_activity(now_ms) < self.timeout_ms
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ActivityTracker {
        ActivityTracker::new(&ControllerConfig::DEFAULT, 0)
    }

    fn axes(h: i16, v: i16) -> AxisSample {
        AxisSample {
            horizontal: h,
            vertical: v,
        }
    }

    #[test]
    fn small_stick_motion_is_not_activity() {
        let mut t = tracker();
        assert!(!t.update(axes(49, -49), ButtonMask::NONE, ButtonMask::NONE, 1_000));
        assert_eq!(t.time_since_last_activity(1_000), 1_000);
    }

    #[test]
    fn threshold_is_inclusive_in_both_directions() {
        let mut t = tracker();
        assert!(t.update(axes(50, 0), ButtonMask::NONE, ButtonMask::NONE, 10));
        assert!(t.update(axes(0, -50), ButtonMask::NONE, ButtonMask::NONE, 20));
        assert_eq!(t.last_activity_ms(), 20);
    }

    #[test]
    fn button_press_and_release_are_activity() {
        let mut t = tracker();
        let a = ButtonMask::from_pressed([true, false, false]);
        assert!(t.update(AxisSample::CENTER, a, ButtonMask::NONE, 100));
        // Holding is not an edge.
        assert!(!t.update(AxisSample::CENTER, a, a, 200));
        assert!(t.update(AxisSample::CENTER, ButtonMask::NONE, a, 300));
        assert_eq!(t.time_since_last_activity(400), 100);
    }

    #[test]
    fn held_stick_keeps_device_awake() {
        let mut t = tracker();
        for now in (0..600_000).step_by(10_000) {
            t.update(axes(2047, 0), ButtonMask::NONE, ButtonMask::NONE, now);
        }
        assert!(t.is_active(600_000));
    }

    #[test]
    fn timeout_boundary() {
        let t = tracker();
        assert!(t.is_active(299_999));
        assert!(!t.is_active(300_000));
    }

    #[test]
    fn clock_going_backwards_reads_as_zero_elapsed() {
        let mut t = tracker();
        t.reset(5_000);
        assert_eq!(t.time_since_last_activity(4_000), 0);
    }
}
