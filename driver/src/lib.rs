//! Host-side driver for the AXI Ethernet IP core.
//!
//! The core exchanges Ethernet frames with the host through two
//! single-producer/single-consumer rings in one DMA region (TX and RX, 256
//! slots of 2 KiB each) and five MMIO index registers. This crate owns that
//! protocol: the register file, the slot framing codec, the send/receive
//! paths, the interrupt-driven wake for the blocking receive, and the
//! ordered bring-up/teardown of the mapping, ring memory, and interrupt
//! line.
//!
//! The environment sits behind [`hal::Platform`], so the same protocol code
//! drives real hardware and the simulated register file used by the tests.
//!
//! # Reference
//! HARDWARE.md

#![no_std]
#![allow(dead_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod device;
pub mod dma;
pub mod error;
pub mod hal;
pub mod irq;
pub mod regs;
pub mod ring;
pub mod stack;

pub use device::{CoreConfig, EthIpCore};
pub use error::{InitError, RxError, TxError};
pub use hal::{DmaRegion, MmioWindow, Platform};
pub use irq::{IrqBridge, WakeFlag};
pub use regs::{MmioRegisters, Registers};
pub use ring::{MAX_PAYLOAD, RING_SLOTS, SLOT_SIZE};
pub use stack::{DeviceAdapter, MAX_FRAME_SIZE};
