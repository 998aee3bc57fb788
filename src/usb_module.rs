//! USB Module
//!
//! This module encapsulates the USB Serial handling used when the firmware is
//! built with the `usb-serial` feature. It manages the global static resources
//! required for the USB stack, handles the initialization, implements the
//! `USBCTRL_IRQ` interrupt handler and exposes the port as a blocking
//! `embedded_io::Write` stream for the reporter.

use core::cell::RefCell;
use critical_section::Mutex;
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;
use usb_device::UsbError;
use usbd_serial::SerialPort;

use rp235x_hal as hal;
use hal::pac;

// Select appropriate interrupt macro based on chip architecture
use rp235x_hal::pac::interrupt;

use adc_reporter::Error;

type UsbBusType = hal::usb::UsbBus;

// Global USB Objects (Mutex protected for ISR access)
static USB_DEVICE: Mutex<RefCell<Option<UsbDevice<UsbBusType>>>> = Mutex::new(RefCell::new(None));
static USB_SERIAL: Mutex<RefCell<Option<SerialPort<UsbBusType>>>> = Mutex::new(RefCell::new(None));

/// Initialize USB Serial and enable the USB interrupt.
pub fn init(
    usb_periph: pac::USB,
    usb_dpram: pac::USB_DPRAM,
    usb_clock: hal::clocks::UsbClock,
    resets: &mut pac::RESETS,
) -> Result<UsbSerial, Error> {
    // 1. Create the USB Bus
    let usb_bus = hal::usb::UsbBus::new(
        usb_periph,
        usb_dpram,
        usb_clock,
        true,
        resets,
    );

    // 2. Create the allocator; it must outlive the device, so it lives in a static
    let bus_allocator: &'static UsbBusAllocator<UsbBusType> =
        cortex_m::singleton!(: UsbBusAllocator<UsbBusType> = UsbBusAllocator::new(usb_bus))
            .ok_or(Error::HardwareInit("usb allocator"))?;

    // 3. Create Device and Serial Port
    let serial = SerialPort::new(bus_allocator);
    let usb_dev = UsbDeviceBuilder::new(bus_allocator, UsbVidPid(0x16c0, 0x27dd))
        .strings(&[StringDescriptors::default()
            .manufacturer("Raspberry Pi")
            .product("Pico 2 Light/POT Reporter")
            .serial_number("ADC002")])
        .map_err(|_| Error::HardwareInit("usb descriptors"))?
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build();

    // 4. Move to Global Storage
    critical_section::with(|cs| {
        USB_DEVICE.borrow_ref_mut(cs).replace(usb_dev);
        USB_SERIAL.borrow_ref_mut(cs).replace(serial);
    });

    // 5. Enable Interrupt
    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
    }

    Ok(UsbSerial)
}

/// Handle to the global USB serial port.
pub struct UsbSerial;

#[derive(Debug, Clone, Copy)]
pub struct UsbWriteError(pub UsbError);

impl embedded_io::Error for UsbWriteError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

impl embedded_io::ErrorType for UsbSerial {
    type Error = UsbWriteError;
}

impl embedded_io::Write for UsbSerial {
    /// Blocks until the endpoint accepts at least one byte. The port is only
    /// locked per attempt so `USBCTRL_IRQ` can drain the endpoint in between.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let attempt = critical_section::with(|cs| {
                match USB_SERIAL.borrow_ref_mut(cs).as_mut() {
                    Some(serial) => serial.write(buf),
                    None => Err(UsbError::InvalidState),
                }
            });
            match attempt {
                Ok(written) if written > 0 => return Ok(written),
                Ok(_) | Err(UsbError::WouldBlock) => cortex_m::asm::wfi(),
                Err(err) => return Err(UsbWriteError(err)),
            }
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        loop {
            let attempt = critical_section::with(|cs| {
                match USB_SERIAL.borrow_ref_mut(cs).as_mut() {
                    Some(serial) => serial.flush(),
                    None => Err(UsbError::InvalidState),
                }
            });
            match attempt {
                Ok(()) => return Ok(()),
                Err(UsbError::WouldBlock) => cortex_m::asm::wfi(),
                Err(err) => return Err(UsbWriteError(err)),
            }
        }
    }
}

/// USB Interrupt Handler
///
/// Handles all USB events (Enumeration, Data In/Out) so the connection stays
/// up while the main loop is blocked in a report or the interval delay.
#[allow(non_snake_case)]
#[interrupt]
fn USBCTRL_IRQ() {
    critical_section::with(|cs| {
        let mut dev = USB_DEVICE.borrow_ref_mut(cs);
        let mut serial = USB_SERIAL.borrow_ref_mut(cs);

        if let (Some(dev), Some(serial)) = (dev.as_mut(), serial.as_mut()) {
            if dev.poll(&mut [serial]) {
                // Host input is not used; drain it so the endpoint keeps moving
                let mut buf = [0u8; 64];
                let _ = serial.read(&mut buf);
            }
        }
    });
}
