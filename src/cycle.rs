use typed_fsm::{state_machine, Transition};

use crate::sampler::SampleSet;

// FSM Context
#[derive(Debug, Default)]
pub struct CycleContext {
    pub pending: Option<SampleSet>, // Sample handed over by the sampler, consumed by the report
    pub reports_sent: u32,
}

// FSM Events
#[derive(Clone, Copy, Debug)]
pub enum CycleEvent {
    SampleReady(SampleSet),
    Transmitted,
    IntervalElapsed,
}

// State Machine Definition
state_machine! {
    Name: CycleFsm,
    Context: CycleContext,
    Event: CycleEvent,
    States: {
        // State: waiting for the sampler to signal a pass
        WaitingForSample => {
            entry: |ctx| {
                ctx.pending = None;
            }
            process: |ctx, evt| {
                match evt {
                    CycleEvent::SampleReady(sample) => {
                        ctx.pending = Some(*sample);
                        Transition::To(CycleFsm::Transmitting)
                    }
                    _ => Transition::None, // Nothing to report yet
                }
            }
        },

        // State: report on the wire, then the fixed pause
        Transmitting => {
            entry: |_ctx| {}
            process: |ctx, evt| {
                match evt {
                    CycleEvent::Transmitted => {
                        ctx.reports_sent = ctx.reports_sent.wrapping_add(1);
                        Transition::None // Still inside the cycle until the pause ends
                    }
                    CycleEvent::IntervalElapsed => Transition::To(CycleFsm::WaitingForSample),
                    CycleEvent::SampleReady(_) => Transition::None, // Ignored mid-cycle
                }
            }
        }
    }
}

impl CycleFsm {
    pub fn name(&self) -> &'static str {
        match self {
            CycleFsm::WaitingForSample => "WAITING_FOR_SAMPLE",
            CycleFsm::Transmitting => "TRANSMITTING",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (CycleFsm, CycleContext) {
        let mut ctx = CycleContext::default();
        let mut fsm = CycleFsm::WaitingForSample;
        fsm.init(&mut ctx);
        (fsm, ctx)
    }

    #[test]
    fn sample_moves_to_transmitting() {
        let (mut fsm, mut ctx) = started();
        let sample = SampleSet { light: 300, potentiometer: 4095 };

        fsm.dispatch(&mut ctx, &CycleEvent::SampleReady(sample));

        assert!(matches!(fsm, CycleFsm::Transmitting));
        assert_eq!(ctx.pending, Some(sample));
    }

    #[test]
    fn waiting_ignores_cycle_events() {
        let (mut fsm, mut ctx) = started();

        fsm.dispatch(&mut ctx, &CycleEvent::Transmitted);
        fsm.dispatch(&mut ctx, &CycleEvent::IntervalElapsed);

        assert!(matches!(fsm, CycleFsm::WaitingForSample));
        assert_eq!(ctx.reports_sent, 0);
    }

    #[test]
    fn full_cycle_returns_to_waiting() {
        let (mut fsm, mut ctx) = started();

        fsm.dispatch(&mut ctx, &CycleEvent::SampleReady(SampleSet::default()));
        fsm.dispatch(&mut ctx, &CycleEvent::Transmitted);
        assert!(matches!(fsm, CycleFsm::Transmitting));

        fsm.dispatch(&mut ctx, &CycleEvent::IntervalElapsed);
        assert!(matches!(fsm, CycleFsm::WaitingForSample));
        assert_eq!(ctx.reports_sent, 1);
        assert_eq!(ctx.pending, None);
        assert_eq!(fsm.name(), "WAITING_FOR_SAMPLE");
    }

    #[test]
    fn sample_mid_cycle_is_ignored() {
        let (mut fsm, mut ctx) = started();
        let first = SampleSet { light: 1, potentiometer: 1 };

        fsm.dispatch(&mut ctx, &CycleEvent::SampleReady(first));
        fsm.dispatch(&mut ctx, &CycleEvent::SampleReady(SampleSet { light: 2, potentiometer: 2 }));

        assert!(matches!(fsm, CycleFsm::Transmitting));
        assert_eq!(ctx.pending, Some(first));
    }
}
