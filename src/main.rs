//! SPDX-License-Identifier: MIT OR Apache-2.0
//!
//! # Light Sensor and Potentiometer Serial Reporter
//!
//! Firmware for the Raspberry Pi Pico 2 (RP2350):
//! - **Hardware Module:** HAL setup and the round-robin ADC engine (`hardware.rs`).
//! - **USB Module:** optional USB CDC report stream (`usb_module.rs`, feature `usb-serial`).
//! - **App:** entry point, ADC interrupt and fatal path (`app.rs`).
//!
//! Sampling and reporting logic lives in the `adc_reporter` library so it can be
//! unit-tested on the host. Build the image with `cargo firmware`.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

// --- Modules ---
#[cfg(target_os = "none")]
mod app;
#[cfg(target_os = "none")]
mod hardware;
#[cfg(all(target_os = "none", feature = "usb-serial"))]
mod usb_module;

// Host builds only carry the library; the image needs an embedded target.
#[cfg(not(target_os = "none"))]
fn main() {}
