//! Application entry point, shared state and interrupt handlers.

// --- Imports ---
use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use panic_probe as _;

use adc_reporter::config::CHANNEL_COUNT;
use adc_reporter::{Error, Reporter, Sampler};

use crate::hardware::{self, Hardware, StatusLed, Timer};

// --- HAL Selection ---
use rp235x_hal as hal;
use hal::entry;

// Select appropriate interrupt macro based on chip architecture
use rp235x_hal::pac::interrupt;

// --- Bootloader Configuration ---

#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: hal::block::ImageDef = hal::block::ImageDef::secure_exe();

// --- Shared State ---

// Latest pass, written by ADC_IRQ_FIFO and taken by the report loop
static SAMPLER: Sampler = Sampler::new();

/// Entry point.
#[entry]
fn main() -> ! {
    info!("Program start");

    // 1. Initialize Hardware Stack (Clocks, GPIO, Timer, ADC, report stream)
    let Hardware { mut status_led, mut timer, mut adc, serial } = match hardware::init() {
        Ok(hw) => hw,
        Err(err) => halt(err),
    };

    // 2. Start background sampling (ADC FIFO interrupt publishes each pass)
    if let Err(err) = SAMPLER.start_continuous(&mut adc, CHANNEL_COUNT) {
        fatal(err, &mut status_led, &mut timer);
    }
    info!("Sampling {} channels", CHANNEL_COUNT);

    // 3. Main Application Loop: wait (wfi), report, pause
    let mut reporter = Reporter::new(serial);

    let result = reporter.run_forever(&SAMPLER, &mut timer, cortex_m::asm::wfi, |sample| {
        info!("light={} pot={}", sample.light, sample.potentiometer);

        // Free-running sampling overwrites hundreds of passes per report
        let stats = SAMPLER.stats();
        debug!("passes={} overruns={}", stats.passes, stats.overruns);
    });

    match result {
        Ok(never) => match never {},
        Err(err) => fatal(err, &mut status_led, &mut timer),
    }
}

/// Fail-stop once the status LED exists: interrupts off, LED blinks forever.
fn fatal(err: Error, led: &mut StatusLed, timer: &mut Timer) -> ! {
    error!("fatal: {}", err);
    cortex_m::interrupt::disable();

    loop {
        let _ = led.set_high();
        timer.delay_ms(100);
        let _ = led.set_low();
        timer.delay_ms(400);
    }
}

/// Fail-stop during bring-up, before there is anything to signal with.
fn halt(err: Error) -> ! {
    error!("start-up failed: {}", err);
    cortex_m::interrupt::disable();

    loop {
        cortex_m::asm::wfi();
    }
}

// --- Interrupt Handlers ---

#[allow(non_snake_case)]
#[interrupt]
fn ADC_IRQ_FIFO() {
    hardware::drain_passes(|raw| SAMPLER.on_conversion_complete(raw));
}

// --- Metadata ---

#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [hal::binary_info::EntryAddr; 4] = [
    hal::binary_info::rp_cargo_bin_name!(),
    hal::binary_info::rp_cargo_version!(),
    hal::binary_info::rp_program_description!(c"Light sensor and potentiometer reporter"),
    hal::binary_info::rp_program_build_attribute!()
];
