//! Hardware Abstraction Module
//!
//! This module handles the low-level configuration of the RP2350 peripherals.
//! It encapsulates the setup of Clocks, PLLs, Timer, GPIOs, ADC and the report
//! stream, exposing a `Hardware` struct to the application, and owns the
//! register-level round-robin ADC engine drained by `ADC_IRQ_FIFO`.

use rp235x_hal as hal;
use hal::pac;

use adc_reporter::config::{
    ADC_CLOCK_DIV, ADC_READY_TIMEOUT_US, ADC_RESYNC_SPIN_LIMIT, CHANNEL_COUNT, LIGHT_CHANNEL,
    POT_CHANNEL,
};
use adc_reporter::{spin_until, ConversionEngine, Error};

#[cfg(not(feature = "usb-serial"))]
use adc_reporter::config::UART_BAUD;
#[cfg(not(feature = "usb-serial"))]
use hal::{
    Clock,
    fugit::RateExtU32,
    uart::{DataBits, StopBits, UartConfig, UartPeripheral},
};

#[cfg(feature = "usb-serial")]
use crate::usb_module;

/// External crystal frequency used by the Raspberry Pi Pico 2.
const XTAL_FREQ_HZ: u32 = 12_000_000u32;

pub type StatusLed = hal::gpio::Pin<
    hal::gpio::bank0::Gpio15,
    hal::gpio::FunctionSio<hal::gpio::SioOutput>,
    hal::gpio::PullDown,
>;

pub type Timer = hal::Timer<hal::timer::CopyableTimer0>;

type LightPin = hal::adc::AdcPin<
    hal::gpio::Pin<hal::gpio::bank0::Gpio26, hal::gpio::FunctionNull, hal::gpio::PullDown>,
>;
type PotPin = hal::adc::AdcPin<
    hal::gpio::Pin<hal::gpio::bank0::Gpio27, hal::gpio::FunctionNull, hal::gpio::PullDown>,
>;

#[cfg(not(feature = "usb-serial"))]
type UartPins = (
    hal::gpio::Pin<hal::gpio::bank0::Gpio0, hal::gpio::FunctionUart, hal::gpio::PullDown>,
    hal::gpio::Pin<hal::gpio::bank0::Gpio1, hal::gpio::FunctionUart, hal::gpio::PullDown>,
);

/// Stream the reports go out on.
#[cfg(not(feature = "usb-serial"))]
pub type ReportSerial = UartPeripheral<hal::uart::Enabled, pac::UART0, UartPins>;
#[cfg(feature = "usb-serial")]
pub type ReportSerial = usb_module::UsbSerial;

/// Everything `main` needs after bring-up.
pub struct Hardware {
    pub status_led: StatusLed,
    pub timer: Timer,
    pub adc: AdcRoundRobin,
    pub serial: ReportSerial,
}

/// Free-running round-robin conversion of the LDR and potentiometer inputs.
///
/// Results land in the ADC FIFO; the FIFO interrupt fires once a full pass
/// (one value per channel) is queued.
pub struct AdcRoundRobin {
    _adc: hal::Adc,
    _light_pin: LightPin,
    _pot_pin: PotPin,
    timer: Timer,
}

impl ConversionEngine for AdcRoundRobin {
    fn start(&mut self, channels: u8) -> Result<(), Error> {
        let adc_regs = unsafe { &(*pac::ADC::ptr()) };

        adc_regs.cs().modify(|_, w| w.en().set_bit());

        let deadline = self.timer.get_counter().ticks() + ADC_READY_TIMEOUT_US;
        while adc_regs.cs().read().ready().bit_is_clear() {
            if self.timer.get_counter().ticks() >= deadline {
                return Err(Error::AdcNotReady);
            }
        }

        unsafe {
            // Sample clock: 48 MHz / (ADC_CLOCK_DIV + 1)
            adc_regs.div().write(|w| w.int().bits(ADC_CLOCK_DIV).frac().bits(0));

            // FIFO Control: Enable, Threshold = one full pass, No DMA
            adc_regs.fcs().modify(|_, w| {
                w.en().set_bit()
                 .thresh().bits(channels)
                 .dreq_en().clear_bit()
            });

            // Enable FIFO Interrupt
            adc_regs.inte().modify(|_, w| w.fifo().set_bit());

            // Channel Control: start on the light channel, rotate over both, free-running
            adc_regs.cs().modify(|_, w| {
                w.ainsel().bits(LIGHT_CHANNEL)
                 .rrobin().bits((1 << LIGHT_CHANNEL) | (1 << POT_CHANNEL))
                 .start_many().set_bit()
            });

            // Unmask ADC Interrupt in NVIC
            cortex_m::peripheral::NVIC::unmask(pac::Interrupt::ADC_IRQ_FIFO);
        }

        Ok(())
    }
}

/// Hand every complete pass queued in the ADC FIFO to `on_pass`.
///
/// Runs in `ADC_IRQ_FIFO`. FIFO entries carry no channel tag, so after an
/// overflow the sequence is restarted on the light channel to keep pairs aligned.
pub fn drain_passes(mut on_pass: impl FnMut([u16; CHANNEL_COUNT as usize])) {
    let adc_regs = unsafe { &(*pac::ADC::ptr()) };

    if adc_regs.fcs().read().over().bit_is_set() {
        resync();
        return;
    }

    while adc_regs.fcs().read().level().bits() >= CHANNEL_COUNT {
        let light = adc_regs.fifo().read().val().bits();
        let pot = adc_regs.fifo().read().val().bits();
        on_pass([light, pot]);
    }
}

fn resync() {
    let adc_regs = unsafe { &(*pac::ADC::ptr()) };

    adc_regs.cs().modify(|_, w| w.start_many().clear_bit());
    if !spin_until(ADC_RESYNC_SPIN_LIMIT, || adc_regs.cs().read().ready().bit_is_set()) {
        // Converter wedged: leave it stopped rather than hang the handler
        return;
    }

    while adc_regs.fcs().read().empty().bit_is_clear() {
        let _ = adc_regs.fifo().read();
    }
    adc_regs.fcs().modify(|_, w| w.over().clear_bit_by_one());

    unsafe {
        adc_regs.cs().modify(|_, w| w.ainsel().bits(LIGHT_CHANNEL).start_many().set_bit());
    }
}

/// Initializes the entire hardware stack.
///
/// This function:
/// 1.  Takes ownership of the raw PAC peripherals.
/// 2.  Configures the Watchdog and Clocks (System & USB).
/// 3.  Initializes the Microsecond Timer.
/// 4.  Configures GPIO pins (status LED, ADC inputs).
/// 5.  Prepares the ADC; sampling itself starts in `ConversionEngine::start`.
/// 6.  Initializes the report stream (UART0, or USB serial with `usb-serial`).
pub fn init() -> Result<Hardware, Error> {
    // 1. Take ownership of raw peripherals
    let mut pac = pac::Peripherals::take().ok_or(Error::HardwareInit("peripherals"))?;
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // 2. Configure Clocks
    let clocks = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .map_err(|_| Error::HardwareInit("clocks"))?;

    // 3. Configure Timer (Microsecond precision)
    let timer = hal::Timer::new_timer0(pac.TIMER0, &mut pac.RESETS, &clocks);

    // 4. Configure GPIOs
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let status_led = pins.gpio15.into_push_pull_output();

    // 5. Configure ADC inputs (GPIO26 = LDR, GPIO27 = potentiometer)
    let adc = AdcRoundRobin {
        _adc: hal::Adc::new(pac.ADC, &mut pac.RESETS),
        _light_pin: hal::adc::AdcPin::new(pins.gpio26)
            .map_err(|_| Error::HardwareInit("light pin"))?,
        _pot_pin: hal::adc::AdcPin::new(pins.gpio27)
            .map_err(|_| Error::HardwareInit("pot pin"))?,
        timer,
    };

    // 6. Configure the report stream
    #[cfg(not(feature = "usb-serial"))]
    let serial = {
        let uart_pins = (
            pins.gpio0.into_function::<hal::gpio::FunctionUart>(),
            pins.gpio1.into_function::<hal::gpio::FunctionUart>(),
        );
        UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
            .enable(
                UartConfig::new(UART_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
                clocks.peripheral_clock.freq(),
            )
            .map_err(|_| Error::HardwareInit("uart"))?
    };

    #[cfg(feature = "usb-serial")]
    let serial = usb_module::init(
        pac.USB,
        pac.USB_DPRAM,
        clocks.usb_clock,
        &mut pac.RESETS,
    )?;

    // Return ready-to-use hardware
    Ok(Hardware { status_led, timer, adc, serial })
}
