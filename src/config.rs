//! Compile-time configuration.

/// Number of ADC channels converted per pass.
pub const CHANNEL_COUNT: u8 = 2;

/// ADC input wired to the light-dependent resistor (GPIO26).
pub const LIGHT_CHANNEL: u8 = 0;

/// ADC input wired to the potentiometer (GPIO27).
pub const POT_CHANNEL: u8 = 1;

/// Pause between two reports.
pub const REPORT_INTERVAL_MS: u32 = 1_000;

/// Capacity of a single formatted report line.
///
/// The longest line is `"Light: 65535 \r\t\t"` (16 bytes).
pub const LINE_CAPACITY: usize = 20;

/// UART0 baud rate (8N1).
pub const UART_BAUD: u32 = 115_200;

/// Integer part of the ADC clock divider.
///
/// 48 MHz / (47_999 + 1) = 1 kS/s, i.e. 500 two-channel passes per second.
pub const ADC_CLOCK_DIV: u16 = 47_999;

/// How long to wait for the converter to report ready after enabling it.
pub const ADC_READY_TIMEOUT_US: u64 = 1_000;

/// Register polls allowed for the converter to go idle during a FIFO resync.
///
/// A conversion takes 96 ADC clocks (2 us); this is several times that at 150 MHz.
pub const ADC_RESYNC_SPIN_LIMIT: u32 = 10_000;
