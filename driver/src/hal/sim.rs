//! Simulated platform and register file.
//!
//! Models the hardware side of the ring protocol well enough to exercise
//! every driver path without an FPGA: the register file records traffic and
//! answers index reads from simulated hardware cursors, TX publishes drain
//! into a frame log, RX frames can be injected immediately or at a
//! scheduled tick, and the one-shot wake interrupt is delivered through the
//! real [`IrqBridge`] whenever the mask register is armed.
//!
//! Time is a deterministic tick counter advanced by `relax()`, so timeout
//! behavior is exact and tests never sleep.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use super::{DmaRegion, MmioWindow, Platform};
use crate::irq::IrqBridge;
use crate::regs::Registers;
use crate::ring::slot::SlotView;
use crate::ring::{advance, RING_BYTES, SLOT_SHIFT, SLOT_SIZE};

/// Simulated clock resolution: ticks per millisecond.
pub const SIM_TICKS_PER_MS: u64 = 1000;

/// Ticks added per `relax()` call.
pub const TICKS_PER_RELAX: u64 = 100;

/// Simulated platform failures, for rollback testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    MapDenied,
    AllocDenied,
    IrqDenied,
}

/// Paired acquire/release counts, one pair per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimCounters {
    pub maps: u32,
    pub unmaps: u32,
    pub dma_allocs: u32,
    pub dma_frees: u32,
    pub irq_claims: u32,
    pub irq_releases: u32,
}

impl SimCounters {
    /// Every acquisition has a matching release.
    pub fn balanced(&self) -> bool {
        self.maps == self.unmaps
            && self.dma_allocs == self.dma_frees
            && self.irq_claims == self.irq_releases
    }
}

struct SimState {
    // Programmed device state
    queue_base: u32,
    queue_capacity: u32,
    mask_armed: bool,

    // Hardware-side cursors
    hw_rx_in: u32,
    rx_acked_out: u32,
    hw_tx_out: u32,
    host_tx_in: u32,

    // Behavior switches
    auto_drain: bool,
    fail_map: bool,
    fail_alloc: bool,
    fail_irq: bool,

    // Observability
    publishes: Vec<u32>,
    transmitted: Vec<Vec<u8>>,
    counters: SimCounters,

    // Resources
    region: Option<DmaRegion>,
    backing: Vec<Box<[u8]>>,
    bridge: Option<IrqBridge<SimRegisterFile>>,
    line: Option<u32>,
    line_masked: bool,

    // Clock and scheduled frame arrivals
    ticks: u64,
    pending_rx: Vec<(u64, Vec<u8>)>,
}

impl SimState {
    fn new() -> Self {
        Self {
            queue_base: 0,
            queue_capacity: 0,
            mask_armed: false,
            hw_rx_in: 0,
            rx_acked_out: 0,
            hw_tx_out: 0,
            host_tx_in: 0,
            auto_drain: false,
            fail_map: false,
            fail_alloc: false,
            fail_irq: false,
            publishes: Vec::new(),
            transmitted: Vec::new(),
            counters: SimCounters::default(),
            region: None,
            backing: Vec::new(),
            bridge: None,
            line: None,
            line_masked: false,
            ticks: 0,
            pending_rx: Vec::new(),
        }
    }

    /// Slot slice inside the simulated DMA region.
    fn slot(&mut self, ring_off: usize, idx: u32) -> &mut [u8] {
        let region = self.region.as_ref().expect("sim: no DMA region mapped");
        let off = ring_off + ((idx as usize) << SLOT_SHIFT);
        assert!(off + SLOT_SIZE <= region.len, "sim: slot outside region");
        unsafe { core::slice::from_raw_parts_mut(region.cpu.as_ptr().add(off), SLOT_SIZE) }
    }

    /// Decode and log the frame in TX slot `idx`.
    fn capture_tx_frame(&mut self, idx: u32) {
        let bytes = self.slot(0, idx);
        let view = SlotView::new(bytes);
        let frame = view
            .decode()
            .expect("sim: host published a slot with a bad length field")
            .to_vec();
        self.transmitted.push(frame);
    }

    /// Write `frame` into the RX ring at the hardware IN cursor and advance
    /// it, exactly as the device's DMA engine would.
    fn deliver_rx_frame(&mut self, frame: &[u8]) {
        let idx = self.hw_rx_in;
        let bytes = self.slot(RING_BYTES, idx);
        SlotView::new(bytes)
            .encode(frame)
            .expect("sim: injected frame exceeds slot capacity");
        self.hw_rx_in = advance(idx);
    }

    /// Bridge clone to fire outside the lock, if the one-shot mask is armed.
    fn pending_fire(&self) -> Option<IrqBridge<SimRegisterFile>> {
        if self.mask_armed {
            self.bridge.clone()
        } else {
            None
        }
    }

    /// Apply scheduled arrivals that are due; returns the wakes to deliver.
    fn apply_due_arrivals(&mut self) -> Vec<IrqBridge<SimRegisterFile>> {
        let now = self.ticks;
        let mut fires = Vec::new();
        let mut i = 0;
        while i < self.pending_rx.len() {
            if self.pending_rx[i].0 <= now {
                let (_, frame) = self.pending_rx.remove(i);
                self.deliver_rx_frame(&frame);
                if let Some(bridge) = self.pending_fire() {
                    fires.push(bridge);
                }
            } else {
                i += 1;
            }
        }
        fires
    }
}

/// Shared handle to the simulated hardware. Clones alias one device.
#[derive(Clone)]
pub struct SimPlatform {
    state: Arc<Mutex<SimState>>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// Drain every published TX frame immediately (hardware keeps up with
    /// the host).
    pub fn set_auto_drain(&self, enabled: bool) {
        self.state.lock().auto_drain = enabled;
    }

    /// Hardware consumes `count` TX slots, advancing its OUT cursor.
    pub fn drain_tx(&self, count: u32) {
        let mut st = self.state.lock();
        for _ in 0..count {
            let idx = st.hw_tx_out;
            st.capture_tx_frame(idx);
            st.hw_tx_out = advance(idx);
        }
    }

    /// A frame arrives from the wire right now.
    pub fn inject_rx_frame(&self, frame: &[u8]) {
        let fire = {
            let mut st = self.state.lock();
            st.deliver_rx_frame(frame);
            st.pending_fire()
        };
        if let Some(bridge) = fire {
            bridge.on_interrupt();
        }
    }

    /// A frame arrives once the simulated clock reaches `tick`.
    pub fn inject_rx_at(&self, tick: u64, frame: &[u8]) {
        self.state.lock().pending_rx.push((tick, frame.to_vec()));
    }

    /// Overwrite the length field of RX slot `idx` with a raw value, as a
    /// misbehaving device would.
    pub fn corrupt_rx_slot_len(&self, idx: u32, raw_len: u64) {
        let mut st = self.state.lock();
        let bytes = st.slot(RING_BYTES, idx);
        bytes[SLOT_SIZE - 16..SLOT_SIZE - 8].copy_from_slice(&raw_len.to_le_bytes());
    }

    /// Frames the simulated hardware has transmitted, in order.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state.lock().transmitted.clone()
    }

    /// Raw TX publish words, in issue order.
    pub fn publishes(&self) -> Vec<u32> {
        self.state.lock().publishes.clone()
    }

    /// Host IN cursor as last published to the TX index register.
    pub fn published_in(&self) -> u32 {
        self.state.lock().host_tx_in
    }

    /// Acquire/release pairing counters.
    pub fn counters(&self) -> SimCounters {
        self.state.lock().counters
    }

    /// Current simulated clock.
    pub fn ticks(&self) -> u64 {
        self.state.lock().ticks
    }

    /// Programmed queue base register.
    pub fn queue_base(&self) -> u32 {
        self.state.lock().queue_base
    }

    /// Programmed queue capacity register.
    pub fn queue_capacity(&self) -> u32 {
        self.state.lock().queue_capacity
    }

    /// Whether the one-shot wake mask is currently armed.
    pub fn mask_armed(&self) -> bool {
        self.state.lock().mask_armed
    }

    /// Whether the line is masked at the controller level.
    pub fn line_masked(&self) -> bool {
        self.state.lock().line_masked
    }

    /// Deny the next register-window mapping.
    pub fn fail_map_registers(&self) {
        self.state.lock().fail_map = true;
    }

    /// Deny the next DMA allocation.
    pub fn fail_alloc_dma(&self) {
        self.state.lock().fail_alloc = true;
    }

    /// Deny the next interrupt claim.
    pub fn fail_claim_irq(&self) {
        self.state.lock().fail_irq = true;
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SimPlatform {
    type Regs = SimRegisterFile;
    type Error = SimError;

    fn map_registers(&mut self, _window: MmioWindow) -> Result<Self::Regs, Self::Error> {
        let mut st = self.state.lock();
        if st.fail_map {
            st.fail_map = false;
            return Err(SimError::MapDenied);
        }
        st.counters.maps += 1;
        Ok(SimRegisterFile {
            state: self.state.clone(),
        })
    }

    fn unmap_registers(&mut self, _regs: Self::Regs, _window: MmioWindow) {
        self.state.lock().counters.unmaps += 1;
    }

    fn alloc_dma(&mut self, bytes: usize) -> Result<DmaRegion, Self::Error> {
        let mut st = self.state.lock();
        if st.fail_alloc {
            st.fail_alloc = false;
            return Err(SimError::AllocDenied);
        }
        let mut backing = vec![0u8; bytes].into_boxed_slice();
        let cpu = core::ptr::NonNull::new(backing.as_mut_ptr()).expect("sim: null backing");
        let region = DmaRegion {
            cpu,
            bus: cpu.as_ptr() as u64,
            len: bytes,
        };
        st.backing.push(backing);
        st.region = Some(region);
        st.counters.dma_allocs += 1;
        Ok(region)
    }

    fn free_dma(&mut self, _region: DmaRegion) {
        let mut st = self.state.lock();
        st.region = None;
        st.counters.dma_frees += 1;
    }

    fn claim_irq(
        &mut self,
        line: u32,
        bridge: IrqBridge<Self::Regs>,
    ) -> Result<(), Self::Error> {
        let mut st = self.state.lock();
        if st.fail_irq {
            st.fail_irq = false;
            return Err(SimError::IrqDenied);
        }
        st.bridge = Some(bridge);
        st.line = Some(line);
        st.counters.irq_claims += 1;
        Ok(())
    }

    fn release_irq(&mut self, line: u32) {
        let mut st = self.state.lock();
        if st.line == Some(line) {
            st.line = None;
            st.bridge = None;
        }
        st.counters.irq_releases += 1;
    }

    fn mask_irq(&mut self, _line: u32) {
        self.state.lock().line_masked = true;
    }

    fn unmask_irq(&mut self, _line: u32) {
        self.state.lock().line_masked = false;
    }

    fn now(&self) -> u64 {
        self.state.lock().ticks
    }

    fn ticks_per_ms(&self) -> u64 {
        SIM_TICKS_PER_MS
    }

    fn relax(&mut self) {
        let fires = {
            let mut st = self.state.lock();
            st.ticks += TICKS_PER_RELAX;
            st.apply_due_arrivals()
        };
        for bridge in fires {
            bridge.on_interrupt();
        }
    }
}

/// Register file of the simulated device.
#[derive(Clone)]
pub struct SimRegisterFile {
    state: Arc<Mutex<SimState>>,
}

impl Registers for SimRegisterFile {
    fn set_queue_base(&self, bus_addr: u32) {
        self.state.lock().queue_base = bus_addr;
    }

    fn set_queue_capacity(&self, slots: u32) {
        self.state.lock().queue_capacity = slots;
    }

    fn rx_hw_in(&self) -> u32 {
        self.state.lock().hw_rx_in
    }

    fn ack_rx_out(&self, out_cursor: u32) {
        self.state.lock().rx_acked_out = out_cursor;
    }

    fn tx_hw_out(&self) -> u32 {
        self.state.lock().hw_tx_out
    }

    fn publish_tx(&self, word: u32) {
        let mut st = self.state.lock();
        st.publishes.push(word);

        // Decode the commit: bits 31:16 length, 15:0 new IN cursor.
        let new_in = word & 0xFFFF;
        st.host_tx_in = new_in;
        if st.auto_drain {
            // Hardware keeps up: consume everything up to the new cursor.
            let mut idx = st.hw_tx_out;
            while idx != new_in {
                st.capture_tx_frame(idx);
                idx = advance(idx);
            }
            st.hw_tx_out = new_in;
        }
    }

    fn set_irq_mask(&self, armed: bool) {
        let fire = {
            let mut st = self.state.lock();
            st.mask_armed = armed;
            // Arming with frames already pending wakes immediately.
            if armed && st.hw_rx_in != st.rx_acked_out {
                st.pending_fire()
            } else {
                None
            }
        };
        if let Some(bridge) = fire {
            bridge.on_interrupt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_balanced() {
        let c = SimCounters {
            maps: 1,
            unmaps: 1,
            ..Default::default()
        };
        assert!(c.balanced());
        let c = SimCounters {
            maps: 1,
            ..Default::default()
        };
        assert!(!c.balanced());
    }

    #[test]
    fn test_relax_advances_clock() {
        let mut p = SimPlatform::new();
        let t0 = p.now();
        p.relax();
        assert_eq!(p.now(), t0 + TICKS_PER_RELAX);
    }
}
