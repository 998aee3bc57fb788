use core::fmt;

/// Errors raised while bringing up or running the reporter.
///
/// None of these are recovered locally; the firmware routes every one of them
/// to its fatal halt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A start-up step failed. The payload names the step.
    HardwareInit(&'static str),
    /// The requested channel count does not match the two-slot destination.
    InvalidChannelCount(u8),
    /// Continuous sampling was already started.
    AlreadyStarted,
    /// The converter did not report ready in time.
    AdcNotReady,
    /// A report line did not fit its buffer.
    Format,
    /// The output stream rejected the report.
    Transmit,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HardwareInit(step) => write!(f, "hardware init failed: {step}"),
            Error::InvalidChannelCount(n) => write!(f, "invalid channel count: {n}"),
            Error::AlreadyStarted => f.write_str("continuous sampling already started"),
            Error::AdcNotReady => f.write_str("ADC not ready"),
            Error::Format => f.write_str("report line overflow"),
            Error::Transmit => f.write_str("transmission failed"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failed_step() {
        assert_eq!(
            Error::HardwareInit("clocks").to_string(),
            "hardware init failed: clocks"
        );
        assert_eq!(Error::InvalidChannelCount(3).to_string(), "invalid channel count: 3");
    }
}
