//! Ring buffer memory.
//!
//! One contiguous DMA-visible region holds both rings: TX first, RX
//! immediately after. The hardware derives the same split from the queue
//! base register, so the layout here and in the device must agree.
//!
//! All raw-pointer slot addressing is confined to this type; everything
//! above it works on slices.

use crate::hal::DmaRegion;
use crate::ring::{RING_BYTES, RING_SLOTS, SLOT_SHIFT, SLOT_SIZE};

/// The combined ring buffer, split into the two ring base offsets.
pub struct RingMemory {
    region: DmaRegion,
}

impl RingMemory {
    /// Bytes required for both rings.
    pub const BYTES: usize = 2 * RING_BYTES;

    /// Take ownership of an allocated region. Returns `None` if the region
    /// is too small to hold both rings.
    pub fn new(region: DmaRegion) -> Option<Self> {
        if region.len < Self::BYTES {
            return None;
        }
        Some(Self { region })
    }

    /// Bus address the hardware should be programmed with.
    pub fn bus_base(&self) -> u64 {
        self.region.bus
    }

    /// Mutable view of TX slot `idx`.
    ///
    /// # Panics
    /// Panics if `idx` is outside the ring.
    pub fn tx_slot(&mut self, idx: u32) -> &mut [u8] {
        assert!(idx < RING_SLOTS, "TX slot index out of range");
        self.slot_at((idx as usize) << SLOT_SHIFT)
    }

    /// Mutable view of RX slot `idx`.
    ///
    /// # Panics
    /// Panics if `idx` is outside the ring.
    pub fn rx_slot(&mut self, idx: u32) -> &mut [u8] {
        assert!(idx < RING_SLOTS, "RX slot index out of range");
        self.slot_at(RING_BYTES + ((idx as usize) << SLOT_SHIFT))
    }

    fn slot_at(&mut self, byte_off: usize) -> &mut [u8] {
        // SAFETY: byte_off is bounded by the two asserts above and the
        // region is at least Self::BYTES long (checked in new); the region
        // is exclusively owned through &mut self.
        unsafe {
            core::slice::from_raw_parts_mut(self.region.cpu.as_ptr().add(byte_off), SLOT_SIZE)
        }
    }

    /// Give the region back for freeing.
    pub fn into_region(self) -> DmaRegion {
        self.region
    }
}
