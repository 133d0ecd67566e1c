//! Power state machine.
//!
//! ```text
//!            activity                idle ≥ timeout, battery ok
//!   Active ◄──────────► IdleWarning ───────────────────────────► DeepSleep
//!     │    idle ≥ timeout - warn    │                                 │
//!     │ battery low                 │ battery low                     │ all wake lines
//!     ▼                             ▼                                 ▼
//!   LowBatterySleep ◄───────────────┘                              Active
//!     │  every 30 s: re-check battery → recovered: Active, else sleep again
//!     │  all wake lines            → Active
//! ```
//!
//! The machine only decides *when* to sleep and *what* to arm. The actual
//! suspension is done by the caller, which reports back with a
//! [`WakeReason`].


use crate::config::ControllerConfig;

/// Power state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Normal operation - sampling and reporting.
    Active,
    /// Still reporting, but the sleep timeout is close.
    IdleWarning,
    /// Suspended until the wake button combo.
    DeepSleep,
    /// Suspended on a low battery; wakes periodically to re-check it.
    LowBatterySleep,
}

impl PowerState {
    pub const fn is_awake(self) -> bool {
        matches!(self, PowerState::Active | PowerState::IdleWarning)
    }

    pub const fn is_sleeping(self) -> bool {
        !self.is_awake()
    }
}

/// What the suspension boundary has to arm before sleeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepRequest {
    /// Sleep state being entered.
    pub state: PowerState,
    /// GPIO lines, one bit per pin number. All of them must be asserted to wake.
    pub wake_mask: u32,
    /// Periodic timer wake, if any.
    pub timer_ms: Option<u64>,
}

impl SleepRequest {
    /// Whether a set of asserted GPIO lines satisfies the wake condition.
    pub const fn wakes_on(&self, asserted: u32) -> bool {
        asserted & self.wake_mask == self.wake_mask
    }
}

/// Why the suspension boundary returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeReason {
    /// GPIO edge; `asserted` holds the lines asserted at wake time.
    Buttons { asserted: u32 },
    /// The periodic sleep timer fired.
    Timer,
}

/// Result of feeding a wake event to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeOutcome {
    /// Back in `Active`; the activity timer restarts at the wake time.
    Resumed,
    /// Wake condition not met, suspend again with this request.
    Resleep(SleepRequest),
}

/// Decides transitions between the power states.
#[derive(Clone, Debug)]
pub struct PowerStateMachine {
    state: PowerState,
    sleep_timeout_ms: u64,
    idle_warning_ms: u64,
    low_battery_sleep_ms: u64,
    wake_mask: u32,
    entered_ms: u64,
}

impl PowerStateMachine {
    /// Fresh machine, as after boot or wake.
    pub fn new(config: &ControllerConfig, now_ms: u64) -> Self {
        Self {
            state: PowerState::Active,
            sleep_timeout_ms: config.sleep_timeout_ms,
            idle_warning_ms: config.idle_warning_ms,
            low_battery_sleep_ms: config.low_battery_sleep_ms,
            wake_mask: config.wake_mask,
            entered_ms: now_ms,
        }
    }

    /// Machine that is already suspended in `state`.
    ///
    /// Used after a wake that reset the chip: nothing survived, but the
    /// wake still has to be judged against the sleep it came from. An awake
    /// `state` gives a fresh `Active` machine.
    pub fn asleep(config: &ControllerConfig, state: PowerState, now_ms: u64) -> Self {
        let mut machine = Self::new(config, now_ms);
        if state.is_sleeping() {
            machine.state = state;
        }
        machine
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Time spent in the current state.
    pub fn time_in_state(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.entered_ms)
    }

    /// One evaluation per control tick.
    ///
    /// Returns the sleep request when this evaluation enters a sleep state.
    /// While already asleep nothing changes; only [`Self::wake`] leaves a
    /// sleep state.
    pub fn evaluate(&mut self, idle_ms: u64, battery_low: bool, now_ms: u64) -> Option<SleepRequest> {
        if self.state.is_sleeping() {
            return None;
        }

        let next = if battery_low {
            PowerState::LowBatterySleep
        } else if idle_ms >= self.sleep_timeout_ms {
            PowerState::DeepSleep
        } else if idle_ms >= self.sleep_timeout_ms.saturating_sub(self.idle_warning_ms) {
            PowerState::IdleWarning
        } else {
            PowerState::Active
        };

        self.transition(next, now_ms);
        self.sleep_request()
    }

    /// Feed a wake event while sleeping.
    ///
    /// `battery_low` is only consulted for a timer wake, and must come from a
    /// reading taken after the wake.
    pub fn wake(&mut self, reason: WakeReason, battery_low: bool, now_ms: u64) -> WakeOutcome {
        let Some(request) = self.sleep_request() else {
            warn!("Power: wake {} while {}", reason, self.state);
            return WakeOutcome::Resumed;
        };

        let resume = match reason {
            WakeReason::Buttons { asserted } => request.wakes_on(asserted),
            WakeReason::Timer => request.timer_ms.is_some() && !battery_low,
        };

        if resume {
            info!("Power: woke from {} ({})", self.state, reason);
            self.transition(PowerState::Active, now_ms);
            WakeOutcome::Resumed
        } else {
            debug!("Power: {} not satisfied, back to {}", reason, self.state);
            WakeOutcome::Resleep(request)
        }
    }

    /// What to arm for the current state; `None` while awake.
    pub fn sleep_request(&self) -> Option<SleepRequest> {
        let timer_ms = match self.state {
            PowerState::Active | PowerState::IdleWarning => return None,
            PowerState::DeepSleep => None,
            PowerState::LowBatterySleep => Some(self.low_battery_sleep_ms),
        };
        Some(SleepRequest {
            state: self.state,
            wake_mask: self.wake_mask,
            timer_ms,
        })
    }

    fn transition(&mut self, next: PowerState, now_ms: u64) {
        if next != self.state {
            info!("Power: {} -> {}", self.state, next);
            self.state = next;
            self.entered_ms = now_ms;
        }
    }
}
