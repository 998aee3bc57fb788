//! Reporter Module
//!
//! Formats the two report lines into fixed-size buffers and pushes them out of
//! any blocking `embedded_io::Write` stream (UART or USB CDC on target).

use core::convert::Infallible;
use core::fmt::Write as FmtWrite;
use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::config::{LINE_CAPACITY, REPORT_INTERVAL_MS};
use crate::cycle::{CycleContext, CycleEvent, CycleFsm};
use crate::error::Error;
use crate::sampler::{SampleSet, Sampler};

pub type ReportLine = String<LINE_CAPACITY>;

/// First report line: `"Light: <raw> \r\t\t"`.
pub fn light_line(raw: u16) -> Result<ReportLine, Error> {
    let mut line = ReportLine::new();
    write!(line, "Light: {} \r\t\t", raw).map_err(|_| Error::Format)?;
    Ok(line)
}

/// Second report line: `"POT: <raw> \r\n"`.
pub fn pot_line(raw: u16) -> Result<ReportLine, Error> {
    let mut line = ReportLine::new();
    write!(line, "POT: {} \r\n", raw).map_err(|_| Error::Format)?;
    Ok(line)
}

/// Periodic reporter bound to one output stream.
pub struct Reporter<W> {
    serial: W,
    fsm: CycleFsm,
    cycle: CycleContext,
    interval_ms: u32,
}

impl<W: embedded_io::Write> Reporter<W> {
    pub fn new(serial: W) -> Self {
        Self::with_interval(serial, REPORT_INTERVAL_MS)
    }

    pub fn with_interval(serial: W, interval_ms: u32) -> Self {
        let mut cycle = CycleContext::default();
        let mut fsm = CycleFsm::WaitingForSample;
        fsm.init(&mut cycle);
        Reporter { serial, fsm, cycle, interval_ms }
    }

    /// Format and send both lines, blocking until the stream has taken them.
    pub fn report(&mut self, sample: SampleSet) -> Result<(), Error> {
        let light = light_line(sample.light)?;
        self.serial.write_all(light.as_bytes()).map_err(|_| Error::Transmit)?;

        let pot = pot_line(sample.potentiometer)?;
        self.serial.write_all(pot.as_bytes()).map_err(|_| Error::Transmit)?;

        self.serial.flush().map_err(|_| Error::Transmit)
    }

    /// One cycle: wait for a pass, report it, then pause for the interval.
    pub fn run_cycle<D: DelayNs>(
        &mut self,
        sampler: &Sampler,
        delay: &mut D,
        idle: impl FnMut(),
    ) -> Result<SampleSet, Error> {
        let sample = sampler.wait_sample(idle);
        self.fsm.dispatch(&mut self.cycle, &CycleEvent::SampleReady(sample));

        if let Some(pending) = self.cycle.pending.take() {
            self.report(pending)?;
            self.fsm.dispatch(&mut self.cycle, &CycleEvent::Transmitted);
        }

        delay.delay_ms(self.interval_ms);
        self.fsm.dispatch(&mut self.cycle, &CycleEvent::IntervalElapsed);

        Ok(sample)
    }

    /// Report forever, handing each reported pass to `on_cycle`.
    /// Only returns on the first error.
    pub fn run_forever<D: DelayNs>(
        &mut self,
        sampler: &Sampler,
        delay: &mut D,
        mut idle: impl FnMut(),
        mut on_cycle: impl FnMut(SampleSet),
    ) -> Result<Infallible, Error> {
        loop {
            let sample = self.run_cycle(sampler, delay, &mut idle)?;
            on_cycle(sample);
        }
    }

    #[cfg(test)]
    fn state(&self) -> &'static str {
        self.fsm.name()
    }

    #[cfg(test)]
    fn reports_sent(&self) -> u32 {
        self.cycle.reports_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::ErrorKind;

    #[derive(Default)]
    struct MockSerial {
        sent: Vec<u8>,
        writes: Vec<Vec<u8>>,
        flushes: u32,
    }

    impl embedded_io::ErrorType for MockSerial {
        type Error = ErrorKind;
    }

    impl embedded_io::Write for MockSerial {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.sent.extend_from_slice(buf);
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushes += 1;
            Ok(())
        }
    }

    struct BrokenSerial;

    impl embedded_io::ErrorType for BrokenSerial {
        type Error = ErrorKind;
    }

    impl embedded_io::Write for BrokenSerial {
        fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> {
            Err(ErrorKind::Other)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDelay {
        total_ns: u64,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    fn sent_text(serial: &MockSerial) -> &str {
        core::str::from_utf8(&serial.sent).unwrap()
    }

    #[test]
    fn lines_use_plain_decimal() {
        assert_eq!(light_line(512).unwrap().as_str(), "Light: 512 \r\t\t");
        assert_eq!(pot_line(7).unwrap().as_str(), "POT: 7 \r\n");
    }

    #[test]
    fn extremes_fit_the_line_buffer() {
        assert_eq!(light_line(0).unwrap().as_str(), "Light: 0 \r\t\t");
        assert_eq!(light_line(u16::MAX).unwrap().as_str(), "Light: 65535 \r\t\t");
        assert_eq!(pot_line(0).unwrap().as_str(), "POT: 0 \r\n");
        assert_eq!(pot_line(u16::MAX).unwrap().as_str(), "POT: 65535 \r\n");
    }

    #[test]
    fn report_sends_both_lines_in_order() {
        let mut reporter = Reporter::new(MockSerial::default());

        reporter.report(SampleSet { light: 300, potentiometer: 4095 }).unwrap();

        assert_eq!(reporter.serial.writes.len(), 2);
        assert_eq!(reporter.serial.writes[0], b"Light: 300 \r\t\t");
        assert_eq!(reporter.serial.writes[1], b"POT: 4095 \r\n");
        assert_eq!(reporter.serial.flushes, 1);
    }

    #[test]
    fn transmit_failure_is_reported() {
        let mut reporter = Reporter::new(BrokenSerial);
        assert_eq!(reporter.report(SampleSet::default()), Err(Error::Transmit));
    }

    #[test]
    fn cycle_reports_injected_pass_then_pauses() {
        let sampler = Sampler::new();
        let mut reporter = Reporter::new(MockSerial::default());
        let mut delay = MockDelay::default();

        sampler.on_conversion_complete([300, 4095]);
        let sample = reporter.run_cycle(&sampler, &mut delay, || {}).unwrap();

        assert_eq!(sample, SampleSet { light: 300, potentiometer: 4095 });
        assert_eq!(sent_text(&reporter.serial), "Light: 300 \r\t\tPOT: 4095 \r\n");
        assert_eq!(delay.total_ns, 1_000_000_000);
        assert_eq!(reporter.state(), "WAITING_FOR_SAMPLE");
        assert_eq!(reporter.reports_sent(), 1);
    }

    #[test]
    fn cycle_waits_for_the_interrupt() {
        let sampler = Sampler::new();
        let mut reporter = Reporter::with_interval(MockSerial::default(), 5);
        let mut delay = MockDelay::default();
        let mut idles = 0;

        reporter
            .run_cycle(&sampler, &mut delay, || {
                idles += 1;
                sampler.on_conversion_complete([0, 65535]);
            })
            .unwrap();

        assert_eq!(idles, 1);
        assert_eq!(sent_text(&reporter.serial), "Light: 0 \r\t\tPOT: 65535 \r\n");
        assert_eq!(delay.total_ns, 5_000_000);
    }

    #[test]
    fn consecutive_cycles_report_each_pass_once() {
        let sampler = Sampler::new();
        let mut reporter = Reporter::new(MockSerial::default());
        let mut delay = MockDelay::default();

        sampler.on_conversion_complete([1, 2]);
        reporter.run_cycle(&sampler, &mut delay, || {}).unwrap();
        sampler.on_conversion_complete([3, 4]);
        reporter.run_cycle(&sampler, &mut delay, || {}).unwrap();

        assert_eq!(
            sent_text(&reporter.serial),
            "Light: 1 \r\t\tPOT: 2 \r\nLight: 3 \r\t\tPOT: 4 \r\n"
        );
        assert_eq!(reporter.reports_sent(), 2);
        assert_eq!(sampler.try_take_sample(), None);
    }

    #[test]
    fn run_forever_stops_on_transmit_error() {
        let sampler = Sampler::new();
        let mut reporter = Reporter::new(BrokenSerial);
        let mut delay = MockDelay::default();

        let mut cycles = 0;

        sampler.on_conversion_complete([5, 6]);
        let result = reporter.run_forever(&sampler, &mut delay, || {}, |_| cycles += 1);

        assert_eq!(result, Err(Error::Transmit));
        assert_eq!(cycles, 0);
        assert_eq!(delay.total_ns, 0);
        assert_eq!(reporter.state(), "TRANSMITTING");
    }
}
