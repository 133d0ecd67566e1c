//! USB HID gamepad device.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes one HID IN endpoint.

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::peripherals;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;
use unrailed_pad::config;
use unrailed_pad::hid::{GamepadReport, GAMEPAD_REPORT_DESCRIPTOR, GAMEPAD_REPORT_SIZE};
use unrailed_pad::Error;

use crate::Irqs;

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// Depth of the report queue between the control loop and the writer.
pub const REPORT_QUEUE_DEPTH: usize = 4;

static GAMEPAD_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Build result containing the USB device runner and the HID writer.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub gamepad_writer: HidWriter<'static, UsbDriver, 8>,
}

/// Initialise the USB stack and create the gamepad device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::MANUFACTURER);
    usb_config.product = Some(config::CONTROLLER_NAME);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 64]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let state = GAMEPAD_STATE.init(State::new());
    let hid_config = HidConfig {
        report_descriptor: GAMEPAD_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let gamepad_writer = HidWriter::new(&mut builder, state, hid_config);

    let device = builder.build();

    info!("USB HID gamepad initialised");

    UsbHidDevice {
        device,
        gamepad_writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Serialise and write one report.
pub async fn send_report(
    writer: &mut HidWriter<'static, UsbDriver, 8>,
    report: &GamepadReport,
) -> Result<(), Error> {
    let mut buf = [0u8; GAMEPAD_REPORT_SIZE];
    let n = report.serialize(&mut buf);
    if n == 0 {
        return Err(Error::BufferOverflow);
    }
    writer.write(&buf[..n]).await.map_err(|e| match e {
        EndpointError::Disabled => Error::UsbDisabled,
        EndpointError::BufferOverflow => Error::BufferOverflow,
    })
}

/// Report forwarding task - reads from the control-loop channel and writes
/// to the HID endpoint. Identical consecutive reports are only resent
/// after a failed write.
pub async fn hid_writer_task(
    mut writer: HidWriter<'static, UsbDriver, 8>,
    report_rx: Receiver<'static, CriticalSectionRawMutex, GamepadReport, REPORT_QUEUE_DEPTH>,
) -> ! {
    info!("HID writer task started - waiting for reports");

    let mut last_sent: Option<GamepadReport> = None;

    loop {
        let report = report_rx.receive().await;
        if last_sent == Some(report) {
            continue;
        }

        match send_report(&mut writer, &report).await {
            Ok(()) => last_sent = Some(report),
            Err(Error::UsbDisabled) => {
                // Host not configured yet (or suspended); drop the report.
                last_sent = None;
            }
            Err(e) => {
                warn!("USB gamepad write failed: {}", e);
                last_sent = None;
            }
        }
    }
}
