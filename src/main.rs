//! Firmware entry point.
//!
//! Boots the board, judges a wake from System OFF, then runs the control
//! loop: every tick samples the hardware, steps the [`Controller`] and
//! hands the report and status to the USB and LED tasks. When the
//! controller asks to sleep, the loop suspends here until a wake
//! condition holds.

#![no_std]
#![no_main]

mod board;
mod led;
mod sleep;
mod usb;

use board::Board;
use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::saadc::{self, ChannelConfig, Saadc};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker, Timer};
use embassy_usb::class::hid::HidWriter;
use embassy_usb::UsbDevice;
use unrailed_pad::config::{self, ControllerConfig};
use unrailed_pad::hid::GamepadReport;
use unrailed_pad::indicator::StatusSnapshot;
use unrailed_pad::{Controller, Error, PowerState, WakeOutcome, WakeReason};
use usb::hid_device::{UsbDriver, REPORT_QUEUE_DEPTH};
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

static REPORTS: Channel<CriticalSectionRawMutex, GamepadReport, REPORT_QUEUE_DEPTH> =
    Channel::new();
static STATUS: Signal<CriticalSectionRawMutex, StatusSnapshot> = Signal::new();

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) -> ! {
    usb::hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_task(writer: HidWriter<'static, UsbDriver, 8>) -> ! {
    usb::hid_device::hid_writer_task(writer, REPORTS.receiver()).await
}

#[embassy_executor::task]
async fn led_task(led: Output<'static>) -> ! {
    led::led_task(led, &STATUS).await
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());

    info!(
        "{=str} {=str} ({=str})",
        config::CONTROLLER_NAME,
        config::FIRMWARE_VERSION,
        config::HARDWARE_VERSION
    );

    let cfg = ControllerConfig::DEFAULT;
    if let Err(e) = cfg.validate().map_err(Error::from) {
        error!("Startup: {}", e);
        panic!("invalid configuration");
    }

    let button_pull = if cfg.buttons_active_low { Pull::Up } else { Pull::Down };
    // USE, DASH, SEL - same order as `cfg.button_pins`.
    let mut buttons = [
        Input::new(p.P0_21, button_pull),
        Input::new(p.P0_18, button_pull),
        Input::new(p.P0_17, button_pull),
    ];

    // A System OFF wake is a reset; decide here whether it counts.
    let mut controller = if sleep::woke_from_system_off() {
        let mut controller = Controller::asleep(cfg, PowerState::DeepSleep, now_ms());
        let request = unwrap!(controller.sleep_request());
        let asserted = sleep::settle_combo(
            &request,
            &mut buttons,
            &cfg.button_pins,
            cfg.buttons_active_low,
            config::WAKE_COMBO_GRACE_MS,
        )
        .await;
        let reason = WakeReason::Buttons { asserted };
        // A button wake never samples the battery.
        match controller.wake(reason, || (0.0, false), now_ms()) {
            WakeOutcome::Resumed => info!("Boot: woke on button combo"),
            WakeOutcome::Resleep(request) => {
                sleep::wait_released(&mut buttons, cfg.buttons_active_low).await;
                sleep::system_off(&request, cfg.buttons_active_low);
            }
        }
        controller
    } else {
        info!("Boot: cold start");
        Controller::new(cfg, now_ms())
    };

    let channels = [
        ChannelConfig::single_ended(p.P0_04), // AIN2: joystick H
        ChannelConfig::single_ended(p.P0_05), // AIN3: joystick V
        ChannelConfig::single_ended(p.P0_03), // AIN1: battery sense
    ];
    let adc = Saadc::new(p.SAADC, Irqs, saadc::Config::default(), channels);
    let bat_stat = Input::new(p.P0_09, Pull::Up);
    // Divided-down VBUS; high while plugged in.
    let usb_sense = Input::new(p.P0_16, Pull::Down);
    let boost_en = Output::new(p.P0_15, Level::High, OutputDrive::Standard);
    let led = Output::new(p.P0_06, Level::Low, OutputDrive::Standard);

    let mut board = Board::new(adc, buttons, bat_stat, usb_sense, boost_en);
    board.calibrate().await;

    let usb = usb::hid_device::init(p.USBD);
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(hid_task(usb.gamepad_writer)));
    unwrap!(spawner.spawn(led_task(led)));

    let reports = REPORTS.sender();
    let mut ticker = Ticker::every(Duration::from_millis(config::CONTROL_TICK_MS));
    let mut last_status: Option<StatusSnapshot> = None;

    info!("Control loop started");

    loop {
        ticker.next().await;

        let reading = board.read().await;
        let out = controller.tick(
            &reading.inputs,
            || (reading.battery_sense_volts, reading.charging),
            now_ms(),
        );

        if let Some(report) = out.report {
            // Writer behind: drop, the next tick carries fresh state.
            let _ = reports.try_send(report);
        }
        if last_status != Some(out.status) {
            STATUS.signal(out.status);
            last_status = Some(out.status);
        }

        let Some(mut request) = out.sleep else {
            continue;
        };

        loop {
            board.set_boost(false);

            if request.state == PowerState::DeepSleep {
                sleep::wait_released(board.buttons(), cfg.buttons_active_low).await;
                // Let the LED task switch off before the GPIOs freeze.
                Timer::after(Duration::from_millis(100)).await;
                sleep::system_off(&request, cfg.buttons_active_low);
            }

            let reason = sleep::idle_until_wake(
                &request,
                board.buttons(),
                &cfg.button_pins,
                cfg.buttons_active_low,
            )
            .await;

            let reading = board.read().await;
            let outcome = controller.wake(
                reason,
                || (reading.battery_sense_volts, reading.charging),
                now_ms(),
            );
            match outcome {
                WakeOutcome::Resumed => break,
                WakeOutcome::Resleep(next) => request = next,
            }
        }

        board.set_boost(true);
        ticker.reset();
        let status = controller.status();
        STATUS.signal(status);
        last_status = Some(status);
    }
}
