//! End-to-end checks for the ring protocol against the simulated platform.
//!
//! The actual tests live in `tests/`; this crate only carries shared
//! helpers for building a device on a fresh simulator.

use axieth::hal::sim::SimPlatform;
use axieth::{CoreConfig, EthIpCore};

/// A core brought up on a fresh simulator with the default configuration.
pub fn fresh_core() -> (SimPlatform, EthIpCore<SimPlatform>) {
    let sim = SimPlatform::new();
    let core = EthIpCore::init(sim.clone(), CoreConfig::default())
        .expect("bring-up on a healthy simulator");
    (sim, core)
}

/// Same, with a shorter receive timeout in milliseconds.
pub fn fresh_core_with_timeout(ms: u64) -> (SimPlatform, EthIpCore<SimPlatform>) {
    let sim = SimPlatform::new();
    let cfg = CoreConfig {
        rx_timeout_ms: ms,
        ..CoreConfig::default()
    };
    let core = EthIpCore::init(sim.clone(), cfg).expect("bring-up on a healthy simulator");
    (sim, core)
}

/// A deterministic test frame of the given length.
pub fn patterned_frame(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}
