//! Suspension boundary.
//!
//! nRF52840 power modes used here:
//! - System ON idle: CPU in WFE between events, RTC keeps time (~3 µA)
//! - System OFF: everything off, wake on GPIO DETECT only (~0.4 µA)
//!
//! System OFF cannot wake on a timer, so `LowBatterySleep` (which needs the
//! 30 s re-check) stays in System ON idle, while `DeepSleep` goes to
//! System OFF. GPIO DETECT fires on *any* sensed line; the all-buttons rule
//! is checked again after the reset, see `main.rs`.

use embassy_futures::select::{select, select3, Either};
use embassy_nrf::pac;
use embassy_nrf::pac::gpio::vals;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use unrailed_pad::config::BUTTON_DEBOUNCE_MS;
use unrailed_pad::input::{ButtonMask, LineLevel};
use unrailed_pad::{SleepRequest, WakeReason};

use crate::board::pin_levels;

/// Whether the last reset was a wake from System OFF. Clears the flag.
pub fn woke_from_system_off() -> bool {
    let woke = pac::POWER.resetreas().read().off();
    pac::POWER.resetreas().write(|w| w.set_off(true));
    woke
}

/// Arm GPIO sense on every line of the wake mask and enter System OFF.
/// Pull and sense level follow the button polarity.
///
/// Does not return; the next thing to run is the reset handler.
pub fn system_off(request: &SleepRequest, active_low: bool) -> ! {
    defmt::info!("Sleep: System OFF, wake mask {=u32:#x}", request.wake_mask);

    let pull = match LineLevel::released(active_low) {
        LineLevel::High => vals::Pull::PULLUP,
        LineLevel::Low => vals::Pull::PULLDOWN,
    };
    let sense = match LineLevel::pressed(active_low) {
        LineLevel::Low => vals::Sense::LOW,
        LineLevel::High => vals::Sense::HIGH,
    };

    for pin in 0..32usize {
        if request.wake_mask & (1 << pin) != 0 {
            pac::P0.pin_cnf(pin).write(|w| {
                w.set_dir(vals::Dir::INPUT);
                w.set_input(vals::Input::CONNECT);
                w.set_pull(pull);
                w.set_sense(sense);
            });
        }
    }
    // Stale DETECT latches would wake us immediately.
    pac::P0.latch().write_value(0xFFFF_FFFF);

    pac::POWER.systemoff().write(|w| w.set_systemoff(true));
    loop {
        cortex_m::asm::wfe();
    }
}

/// Wait until no button is held, so sense does not trip on entry.
pub async fn wait_released<P: Wait + InputPin>(buttons: &mut [P; 3], active_low: bool) {
    for pin in buttons.iter_mut() {
        let _ = match LineLevel::released(active_low) {
            LineLevel::High => pin.wait_for_high().await,
            LineLevel::Low => pin.wait_for_low().await,
        };
    }
}

/// System ON idle until the request's timer or its button combo.
pub async fn idle_until_wake<P: Wait + InputPin>(
    request: &SleepRequest,
    buttons: &mut [P; 3],
    button_pins: &[u8; 3],
    active_low: bool,
) -> WakeReason {
    let Some(timer_ms) = request.timer_ms else {
        let asserted = wait_for_combo(request, buttons, button_pins, active_low).await;
        return WakeReason::Buttons { asserted };
    };

    defmt::info!("Sleep: idle for {=u64} ms", timer_ms);
    match select(
        Timer::after(Duration::from_millis(timer_ms)),
        wait_for_combo(request, buttons, button_pins, active_low),
    )
    .await
    {
        Either::First(()) => WakeReason::Timer,
        Either::Second(asserted) => WakeReason::Buttons { asserted },
    }
}

/// Give the combo `within_ms` to complete, then report whatever is
/// asserted.
pub async fn settle_combo<P: Wait + InputPin>(
    request: &SleepRequest,
    buttons: &mut [P; 3],
    button_pins: &[u8; 3],
    active_low: bool,
    within_ms: u64,
) -> u32 {
    let combo = wait_for_combo(request, buttons, button_pins, active_low);
    let settled = select(Timer::after(Duration::from_millis(within_ms)), combo).await;
    match settled {
        Either::First(()) => asserted_lines(buttons, button_pins, active_low),
        Either::Second(asserted) => asserted,
    }
}

/// Resolve once every line of the wake mask is asserted; returns the
/// asserted lines.
async fn wait_for_combo<P: Wait + InputPin>(
    request: &SleepRequest,
    buttons: &mut [P; 3],
    button_pins: &[u8; 3],
    active_low: bool,
) -> u32 {
    loop {
        let asserted = asserted_lines(buttons, button_pins, active_low);
        if request.wakes_on(asserted) {
            return asserted;
        }

        {
            let [a, b, c] = &mut *buttons;
            let _ = select3(a.wait_for_any_edge(), b.wait_for_any_edge(), c.wait_for_any_edge()).await;
        }
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
    }
}

/// GPIO lines of the currently pressed buttons.
pub fn asserted_lines<P: InputPin>(buttons: &mut [P; 3], button_pins: &[u8; 3], active_low: bool) -> u32 {
    let pressed = pin_levels(buttons).map(|high| high != active_low);
    ButtonMask::from_pressed(pressed).gpio_lines(button_pins)
}
