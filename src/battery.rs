//! Battery voltage to charge-level conversion.
//!
//! The sense pin sits behind a 100k/100k divider, so the converter sees
//! half the cell voltage. Percentage is a straight line between the
//! configured empty and full voltages; Li-Po discharge is not linear but
//! the estimate only drives the low-battery cut-off and the LED.

use crate::config::ControllerConfig;

/// Slack on the low-battery comparison. f32 puts a cell sitting exactly
/// on the threshold a few millionths of a percent above it.
const THRESHOLD_EPSILON_PERCENT: f32 = 1e-3;

/// Low/normal classification of a reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryLevel {
    Normal,
    Low,
}

/// One battery measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryReading {
    /// Voltage at the sense pin.
    pub sense_voltage: f32,
    /// Cell voltage (sense × divider ratio).
    pub voltage: f32,
    /// Estimated charge, 0.0..=100.0.
    pub percentage: f32,
    pub level: BatteryLevel,
    /// Charger reports charging.
    pub charging: bool,
}

impl BatteryReading {
    pub fn is_low(&self) -> bool {
        self.level == BatteryLevel::Low
    }
}

/// Converts battery sense samples into readings and paces how often they
/// are taken.
#[derive(Clone, Debug)]
pub struct BatteryMonitor {
    min_voltage: f32,
    max_voltage: f32,
    divider_ratio: f32,
    low_threshold: f32,
    interval_ms: u64,
    last_sample_ms: Option<u64>,
    last: Option<BatteryReading>,
}

impl BatteryMonitor {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            min_voltage: config.battery_min_voltage,
            max_voltage: config.battery_max_voltage,
            divider_ratio: config.voltage_divider_ratio,
            low_threshold: config.low_battery_threshold,
            interval_ms: config.battery_check_interval_ms,
            last_sample_ms: None,
            last: None,
        }
    }

    /// Build a reading from the sense-pin voltage and the charge input.
    pub fn sample(&self, sense_voltage: f32, charging: bool) -> BatteryReading {
        let voltage = sense_voltage * self.divider_ratio;
        let percentage = self.percentage(voltage);
        let level = if percentage <= self.low_threshold + THRESHOLD_EPSILON_PERCENT {
            BatteryLevel::Low
        } else {
            BatteryLevel::Normal
        };
        BatteryReading {
            sense_voltage,
            voltage,
            percentage,
            level,
            charging,
        }
    }

    /// Linear estimate between the empty and full voltages, clamped to 0..=100.
    pub fn percentage(&self, voltage: f32) -> f32 {
        let fraction = (voltage - self.min_voltage) / (self.max_voltage - self.min_voltage);
        // NaN from a broken read counts as empty.
        if fraction.is_nan() {
            return 0.0;
        }
        (fraction * 100.0).clamp(0.0, 100.0)
    }

    /// Sample through `read` once the check interval has elapsed since the
    /// previous sample. The first call always samples.
    pub fn poll<F>(&mut self, now_ms: u64, read: F) -> Option<BatteryReading>
    where
        F: FnOnce() -> (f32, bool),
    {
        let due = match self.last_sample_ms {
            None => true,
            Some(then) => now_ms.saturating_sub(then) >= self.interval_ms,
        };
        if !due {
            return None;
        }
        Some(self.force(now_ms, read))
    }

    /// Sample now regardless of the interval and restart it.
    pub fn force<F>(&mut self, now_ms: u64, read: F) -> BatteryReading
    where
        F: FnOnce() -> (f32, bool),
    {
        let (sense_voltage, charging) = read();
        let reading = self.sample(sense_voltage, charging);
        if self.last.map(|r| r.level) != Some(reading.level) {
            info!(
                "Battery: {=f32} V ({=f32} %) level={}",
                reading.voltage,
                reading.percentage,
                reading.level
            );
        } else {
            debug!("Battery: {=f32} V ({=f32} %)", reading.voltage, reading.percentage);
        }
        self.last_sample_ms = Some(now_ms);
        self.last = Some(reading);
        reading
    }

    /// Most recent reading, if any.
    pub fn last(&self) -> Option<BatteryReading> {
        self.last
    }

    /// `true` only when a reading exists and it is low.
    pub fn is_low(&self) -> bool {
        self.last.is_some_and(|r| r.is_low())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> BatteryMonitor {
        BatteryMonitor::new(&ControllerConfig::DEFAULT)
    }

    #[test]
    fn percentage_endpoints_are_exact() {
        let m = monitor();
        assert_eq!(m.percentage(3.0), 0.0);
        assert_eq!(m.percentage(4.2), 100.0);
    }

    #[test]
    fn percentage_is_clamped() {
        let m = monitor();
        assert_eq!(m.percentage(0.0), 0.0);
        assert_eq!(m.percentage(2.5), 0.0);
        assert_eq!(m.percentage(5.0), 100.0);
        assert_eq!(m.percentage(f32::NAN), 0.0);
    }

    #[test]
    fn percentage_is_monotonic() {
        let m = monitor();
        let mut prev = m.percentage(2.0);
        let mut v = 2.0f32;
        while v < 5.0 {
            v += 0.01;
            let p = m.percentage(v);
            assert!(p >= prev, "{v} V gave {p} after {prev}");
            prev = p;
        }
    }

    #[test]
    fn half_charge_at_3_6_volts() {
        let r = monitor().sample(1.8, false);
        assert!((r.voltage - 3.6).abs() < 1e-5);
        assert!((r.percentage - 50.0).abs() < 0.01);
        assert_eq!(r.level, BatteryLevel::Normal);
    }

    #[test]
    fn low_threshold_is_inclusive() {
        let m = monitor();
        // 15 % of 1.2 V above 3.0 V = 3.18 V at the cell.
        assert_eq!(m.sample(1.5, false).level, BatteryLevel::Low);
        assert_eq!(m.sample(1.58, false).level, BatteryLevel::Low);
        assert_eq!(m.sample(1.6, false).level, BatteryLevel::Normal);
    }

    #[test]
    fn exactly_fifteen_percent_is_low() {
        let m = monitor();
        let r = m.sample(1.59, false); // 3.18 V
        assert!((r.percentage - 15.0).abs() < 1e-3);
        assert_eq!(r.level, BatteryLevel::Low);
        assert_eq!(m.sample(1.5906, false).level, BatteryLevel::Normal);
    }

    #[test]
    fn charging_flag_is_carried() {
        let m = monitor();
        assert!(m.sample(2.0, true).charging);
        assert!(!m.sample(2.0, false).charging);
    }

    #[test]
    fn poll_respects_interval() {
        let mut m = monitor();
        assert!(m.poll(0, || (2.0, false)).is_some());
        assert!(m.poll(1_000, || (2.0, false)).is_none());
        assert!(m.poll(4_999, || (2.0, false)).is_none());
        assert!(m.poll(5_000, || (1.5, false)).is_some());
        assert!(m.is_low());
        assert!(m.poll(9_999, || (2.0, false)).is_none());
        assert!(m.is_low());
    }

    #[test]
    fn force_restarts_the_interval() {
        let mut m = monitor();
        m.poll(0, || (2.0, false));
        m.force(3_000, || (2.0, true));
        assert!(m.poll(5_000, || (2.0, false)).is_none());
        assert!(m.poll(8_000, || (2.0, false)).is_some());
    }

    #[test]
    fn unknown_battery_is_not_low() {
        let m = monitor();
        assert!(m.last().is_none());
        assert!(!m.is_low());
    }
}
