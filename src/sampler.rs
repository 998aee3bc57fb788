//! Sampler Module
//!
//! Owns the latest completed conversion pass and hands it from the ADC
//! interrupt to the main loop through a one-slot mailbox. The interrupt
//! overwrites the slot (latest pass wins); the main loop takes it and clears
//! the ready flag in the same critical section, so a pass is never read half
//! old and half new.

use core::cell::RefCell;
use critical_section::Mutex;

use crate::config::{CHANNEL_COUNT, LIGHT_CHANNEL, POT_CHANNEL};
use crate::error::Error;

/// Raw readings of one completed conversion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleSet {
    pub light: u16,
    pub potentiometer: u16,
}

impl From<[u16; CHANNEL_COUNT as usize]> for SampleSet {
    fn from(raw: [u16; CHANNEL_COUNT as usize]) -> Self {
        SampleSet {
            light: raw[LIGHT_CHANNEL as usize],
            potentiometer: raw[POT_CHANNEL as usize],
        }
    }
}

/// Counters kept alongside the mailbox. Both wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerStats {
    /// Completed conversion passes.
    pub passes: u32,
    /// Passes that landed while the previous one was still unconsumed.
    pub overruns: u32,
}

/// Hardware that can run a free-running multi-channel conversion sequence.
pub trait ConversionEngine {
    /// Start converting `channels` inputs in round-robin, forever.
    fn start(&mut self, channels: u8) -> Result<(), Error>;
}

struct Mailbox {
    latest: SampleSet,
    ready: bool,
    started: bool,
    stats: SamplerStats,
}

impl Mailbox {
    const fn new() -> Self {
        Mailbox {
            latest: SampleSet { light: 0, potentiometer: 0 },
            ready: false,
            started: false,
            stats: SamplerStats { passes: 0, overruns: 0 },
        }
    }
}

/// Poll `ready` up to `limit` times. Returns whether it came true.
///
/// For waits that cannot use the timer, such as inside an interrupt handler.
pub fn spin_until(limit: u32, mut ready: impl FnMut() -> bool) -> bool {
    (0..limit).any(|_| ready())
}

/// Latest-sample mailbox shared between interrupt and thread context.
pub struct Sampler {
    mailbox: Mutex<RefCell<Mailbox>>,
}

impl Sampler {
    pub const fn new() -> Self {
        Sampler { mailbox: Mutex::new(RefCell::new(Mailbox::new())) }
    }

    /// Start continuous sampling on `engine`.
    ///
    /// Only the first call starts the engine; later calls fail with
    /// [`Error::AlreadyStarted`]. A failed start leaves the sampler unstarted.
    pub fn start_continuous<E: ConversionEngine>(
        &self,
        engine: &mut E,
        channel_count: u8,
    ) -> Result<(), Error> {
        if channel_count != CHANNEL_COUNT {
            return Err(Error::InvalidChannelCount(channel_count));
        }

        critical_section::with(|cs| {
            let mut mailbox = self.mailbox.borrow_ref_mut(cs);
            if mailbox.started {
                return Err(Error::AlreadyStarted);
            }
            *mailbox = Mailbox::new();
            mailbox.started = true;
            Ok(())
        })?;

        // The engine unmasks its interrupt, so it must run outside the critical section
        engine.start(channel_count).inspect_err(|_| {
            critical_section::with(|cs| self.mailbox.borrow_ref_mut(cs).started = false);
        })
    }

    /// Publish a finished pass. Called from the ADC interrupt.
    pub fn on_conversion_complete(&self, raw: [u16; CHANNEL_COUNT as usize]) {
        critical_section::with(|cs| {
            let mut mailbox = self.mailbox.borrow_ref_mut(cs);
            if mailbox.ready {
                mailbox.stats.overruns = mailbox.stats.overruns.wrapping_add(1);
            }
            mailbox.stats.passes = mailbox.stats.passes.wrapping_add(1);
            mailbox.latest = SampleSet::from(raw);
            mailbox.ready = true;
        });
    }

    /// Take the pending pass, if any, without blocking.
    pub fn try_take_sample(&self) -> Option<SampleSet> {
        critical_section::with(|cs| self.take(cs))
    }

    /// Whether a pass is waiting to be taken.
    pub fn is_ready(&self) -> bool {
        critical_section::with(|cs| self.mailbox.borrow_ref(cs).ready)
    }

    /// Block until a pass is available, calling `idle` between polls.
    ///
    /// `idle` runs inside the same critical section as the empty check, so a
    /// pass cannot land between the check and the sleep. On target `idle` is
    /// `wfi`, which still wakes on a pending interrupt while interrupts are
    /// masked; the handler then runs once the critical section ends.
    pub fn wait_sample(&self, mut idle: impl FnMut()) -> SampleSet {
        loop {
            let taken = critical_section::with(|cs| {
                let taken = self.take(cs);
                if taken.is_none() {
                    idle();
                }
                taken
            });
            if let Some(sample) = taken {
                return sample;
            }
        }
    }

    fn take(&self, cs: critical_section::CriticalSection<'_>) -> Option<SampleSet> {
        let mut mailbox = self.mailbox.borrow_ref_mut(cs);
        if mailbox.ready {
            mailbox.ready = false;
            Some(mailbox.latest)
        } else {
            None
        }
    }

    pub fn stats(&self) -> SamplerStats {
        critical_section::with(|cs| self.mailbox.borrow_ref(cs).stats)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
