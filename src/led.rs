//! Status LED task.
//!
//! Shows the boot greeting, then follows whatever pattern the latest
//! [`StatusSnapshot`] maps to.

use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Level, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use unrailed_pad::indicator::{BlinkPattern, StatusSnapshot};

/// LED refresh period.
const LED_STEP_MS: u64 = 50;

pub async fn led_task(
    mut led: Output<'static>,
    status: &'static Signal<CriticalSectionRawMutex, StatusSnapshot>,
) -> ! {
    let mut pattern = BlinkPattern::STARTUP;
    let mut started = Instant::now();
    let mut latest = BlinkPattern::Off;

    loop {
        let elapsed = started.elapsed().as_millis();
        let greeting = matches!(pattern, BlinkPattern::Startup { .. });
        if greeting && pattern.duration_ms().is_some_and(|d| elapsed >= d) {
            pattern = latest;
            started = Instant::now();
        }

        let on = pattern.level_at(started.elapsed().as_millis());
        led.set_level(if on { Level::High } else { Level::Low });

        match select(Timer::after(Duration::from_millis(LED_STEP_MS)), status.wait()).await {
            Either::First(()) => {}
            Either::Second(snapshot) => {
                latest = BlinkPattern::for_status(&snapshot);
                let greeting = matches!(pattern, BlinkPattern::Startup { .. });
                if latest != pattern && !greeting {
                    defmt::debug!("LED: {} -> {}", pattern, latest);
                    pattern = latest;
                    started = Instant::now();
                }
            }
        }
    }
}
