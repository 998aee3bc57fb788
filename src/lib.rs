//! SPDX-License-Identifier: MIT OR Apache-2.0
//!
//! # Dual-Channel ADC Reporter
//!
//! Hardware-independent core of the firmware:
//! - **Sampler:** one-slot mailbox between the ADC interrupt and the main loop (`sampler.rs`).
//! - **Reporter:** two-line serial report once per cycle (`report.rs`).
//! - **FSM:** typed state machine tracking the report cycle (`cycle.rs`).
//!
//! Everything here is `no_std` and runs on the host for unit tests; the RP2350
//! bring-up lives in the firmware binary.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod cycle;
pub mod error;
pub mod report;
pub mod sampler;

pub use error::Error;
pub use report::Reporter;
pub use sampler::{spin_until, ConversionEngine, SampleSet, Sampler, SamplerStats};
