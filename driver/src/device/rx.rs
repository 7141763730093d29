//! Receive protocol.
//!
//! Hardware-driven enqueue: the device produces into the RX ring, the host
//! drains it. The blocking variant arms the one-shot wake interrupt and
//! waits out a bounded deadline; the poll variant never arms and never
//! waits. Either way the RX index register is re-read before deciding the
//! ring is empty.

use log::error;

use crate::error::RxError;
use crate::hal::Platform;
use crate::regs::Registers;
use crate::ring::advance;
use crate::ring::slot::SlotView;

use super::EthIpCore;

impl<P: Platform> EthIpCore<P> {
    /// Receive one frame, blocking up to the configured timeout.
    ///
    /// Returns `Ok(None)` when nothing arrived before the deadline (or the
    /// wait was cancelled): a polite empty, not an error; callers loop and
    /// re-check their own shutdown condition.
    pub fn receive_frame(&mut self, buf: &mut [u8]) -> Result<Option<usize>, RxError> {
        let regs = match &self.regs {
            Some(regs) => regs.clone(),
            None => return Err(RxError::DeviceNotReady),
        };

        if self.rx.is_empty() {
            self.rx.in_idx = regs.rx_hw_in();
            if self.rx.is_empty() && !self.wake.is_cancelled() {
                // Drop any stale wake from a prior arm, then request a
                // one-shot wake and wait it out.
                self.wake.consume();
                regs.set_irq_mask(true);
                self.wait_for_wake();
                // Re-read no matter how the wait ended; the frame may have
                // landed right at the deadline.
                self.rx.in_idx = regs.rx_hw_in();
            }
        }

        if self.rx.is_empty() {
            return Ok(None);
        }
        self.consume_slot(&regs, buf)
    }

    /// Receive one frame without arming the interrupt or waiting.
    pub fn poll_frame(&mut self, buf: &mut [u8]) -> Result<Option<usize>, RxError> {
        let regs = match &self.regs {
            Some(regs) => regs.clone(),
            None => return Err(RxError::DeviceNotReady),
        };

        if self.rx.is_empty() {
            self.rx.in_idx = regs.rx_hw_in();
        }
        if self.rx.is_empty() {
            return Ok(None);
        }
        self.consume_slot(&regs, buf)
    }

    /// Copy the frame in slot OUT into `buf`, advance and acknowledge.
    ///
    /// A corrupt hardware length drops the frame but still consumes the
    /// slot, so one bad slot cannot wedge the ring. `BufferTooSmall` leaves
    /// the slot in place for a retry with a bigger buffer.
    fn consume_slot(
        &mut self,
        regs: &P::Regs,
        buf: &mut [u8],
    ) -> Result<Option<usize>, RxError> {
        let out = self.rx.out_idx;
        let decoded: Result<usize, RxError> = {
            let mem = match &mut self.mem {
                Some(mem) => mem,
                None => return Err(RxError::DeviceNotReady),
            };
            let view = SlotView::new(mem.rx_slot(out));
            match view.decode() {
                Ok(payload) => {
                    let len = payload.len();
                    if len > buf.len() {
                        return Err(RxError::BufferTooSmall { needed: len });
                    }
                    buf[..len].copy_from_slice(payload);
                    Ok(len)
                }
                Err(e) => Err(e),
            }
        };

        self.rx.out_idx = advance(out);
        regs.ack_rx_out(self.rx.out_idx);

        match decoded {
            Ok(len) => Ok(Some(len)),
            Err(e) => {
                error!("RX slot {} carries a corrupt length field, frame dropped", out);
                Err(e)
            }
        }
    }

    /// Spin until the wake flag is raised, the wait is cancelled, or the
    /// deadline passes.
    fn wait_for_wake(&mut self) {
        let deadline = self.platform.now().saturating_add(
            self.cfg
                .rx_timeout_ms
                .saturating_mul(self.platform.ticks_per_ms()),
        );
        loop {
            if self.wake.consume() || self.wake.is_cancelled() {
                break;
            }
            if self.platform.now() >= deadline {
                break;
            }
            self.platform.relax();
        }
    }
}
