//! Transmit protocol.
//!
//! Host-driven enqueue: the host produces into the TX ring, the hardware
//! drains it autonomously. Never blocks; a full ring surfaces as
//! [`TxError::Busy`] and backpressure belongs to the caller.

use crate::error::TxError;
use crate::hal::Platform;
use crate::regs::{publish_word, Registers};
use crate::ring::slot::SlotView;
use crate::ring::{advance, MAX_PAYLOAD};

use super::EthIpCore;

impl<P: Platform> EthIpCore<P> {
    /// Enqueue one frame for transmission.
    ///
    /// The ring-full check first trusts the cached hardware OUT cursor and
    /// only rereads the TX index register when the ring looks full, picking
    /// up whatever progress the hardware has made since. One slot of slack
    /// stays reserved so a full ring never looks empty.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), TxError> {
        if frame.len() > MAX_PAYLOAD {
            return Err(TxError::FrameTooLarge);
        }
        let regs = match &self.regs {
            Some(regs) => regs.clone(),
            None => return Err(TxError::DeviceNotReady),
        };

        let next_in = advance(self.tx.in_idx);
        if self.tx.out_idx == next_in {
            self.tx.out_idx = regs.tx_hw_out();
        }
        if self.tx.out_idx == next_in {
            return Err(TxError::Busy);
        }

        let mem = match &mut self.mem {
            Some(mem) => mem,
            None => return Err(TxError::DeviceNotReady),
        };
        SlotView::new(mem.tx_slot(self.tx.in_idx)).encode(frame)?;

        // Commit point: one write tells the hardware both the frame length
        // and the new IN cursor.
        self.tx.in_idx = next_in;
        regs.publish_tx(publish_word(frame.len(), next_in));
        Ok(())
    }

    /// Whether `send_frame` would currently accept a frame.
    pub fn can_send(&mut self) -> bool {
        let next_in = advance(self.tx.in_idx);
        if self.tx.out_idx == next_in {
            if let Some(regs) = &self.regs {
                self.tx.out_idx = regs.tx_hw_out();
            }
        }
        self.tx.out_idx != next_in
    }
}
