//! smoltcp integration layer.
//!
//! This is the driver's face toward the OS network stack: a thin
//! [`DeviceAdapter`] bridging [`EthIpCore`] to smoltcp's `Device` trait,
//! plus the frame-size contract and traffic counters. Nothing here touches
//! ring internals; the adapter is the collaborator that, per the device
//! contract, opens with `init`, polls with buffers at least
//! [`MAX_FRAME_SIZE`] long, treats `Busy` as transient backpressure, and
//! closes with `cancel_receive` + `exit`.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

use smoltcp::phy::{Device, DeviceCapabilities, Medium, RxToken, TxToken};
use smoltcp::time::Instant;

use crate::device::EthIpCore;
use crate::error::TxError;
use crate::hal::Platform;
use crate::ring::MAX_PAYLOAD;

/// Largest Ethernet frame the MAC handles: header + tag + payload +
/// trailing checksums.
///
/// # Reference
/// HARDWARE.md §6
pub const MAX_FRAME_SIZE: usize = 12 + 2 + 1500 + 4 + 4;

/// Thin adapter that exposes an [`EthIpCore`] to smoltcp.
pub struct DeviceAdapter<P: Platform> {
    pub inner: EthIpCore<P>,
}

impl<P: Platform> DeviceAdapter<P> {
    pub fn new(inner: EthIpCore<P>) -> Self {
        Self { inner }
    }

    /// Hand the core back (for `exit`).
    pub fn into_inner(self) -> EthIpCore<P> {
        self.inner
    }
}

impl<P: Platform> Device for DeviceAdapter<P> {
    type RxToken<'a> = AdapterRxToken<'a, P> where P: 'a;
    type TxToken<'a> = AdapterTxToken<'a, P> where P: 'a;

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.max_transmission_unit = MAX_FRAME_SIZE;
        caps.medium = Medium::Ethernet;
        caps
    }

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        // Poll, never block: smoltcp drives its own pacing. The slot can
        // legally carry up to MAX_PAYLOAD bytes, so the staging buffer is
        // that large even though conforming frames stop at MAX_FRAME_SIZE.
        let mut staged = [0u8; MAX_PAYLOAD];
        match self.inner.poll_frame(&mut staged) {
            Ok(Some(len)) if len > 0 => {
                RX_PACKET_COUNT.fetch_add(1, Ordering::Relaxed);
                let device_ptr: *mut EthIpCore<P> = &mut self.inner;
                let mut token = AdapterRxToken {
                    buffer: [0u8; MAX_PAYLOAD],
                    len,
                    _p: PhantomData,
                };
                token.buffer[..len].copy_from_slice(&staged[..len]);
                Some((
                    token,
                    AdapterTxToken {
                        device: device_ptr,
                        _p: PhantomData,
                    },
                ))
            }
            Err(_) => {
                RX_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
                None
            }
            _ => None,
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.inner.can_send() {
            let device_ptr: *mut EthIpCore<P> = &mut self.inner;
            Some(AdapterTxToken {
                device: device_ptr,
                _p: PhantomData,
            })
        } else {
            None
        }
    }
}

pub struct AdapterRxToken<'a, P: Platform> {
    buffer: [u8; MAX_PAYLOAD],
    len: usize,
    _p: PhantomData<&'a mut EthIpCore<P>>,
}

impl<'a, P: Platform> RxToken for AdapterRxToken<'a, P> {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        // The frame was already copied out of the ring when the token was
        // minted; the slot is long since acknowledged.
        let mut buf = self.buffer;
        f(&mut buf[..self.len])
    }
}

pub struct AdapterTxToken<'a, P: Platform> {
    device: *mut EthIpCore<P>,
    _p: PhantomData<&'a mut EthIpCore<P>>,
}

impl<'a, P: Platform> TxToken for AdapterTxToken<'a, P> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let result = f(&mut buffer[..len]);

        // smoltcp expects `result` back regardless of TX fate; a full ring
        // shows up in the counters and the stack retransmits.
        match unsafe { (*self.device).send_frame(&buffer[..len]) } {
            Ok(()) => {
                TX_PACKET_COUNT.fetch_add(1, Ordering::Relaxed);
            }
            Err(TxError::Busy) => {
                TX_BUSY_COUNT.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                TX_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
            }
        }

        result
    }
}

static TX_PACKET_COUNT: AtomicU32 = AtomicU32::new(0);
static TX_BUSY_COUNT: AtomicU32 = AtomicU32::new(0);
static TX_ERROR_COUNT: AtomicU32 = AtomicU32::new(0);
static RX_PACKET_COUNT: AtomicU32 = AtomicU32::new(0);
static RX_ERROR_COUNT: AtomicU32 = AtomicU32::new(0);

/// Get the number of packets transmitted.
pub fn tx_packet_count() -> u32 {
    TX_PACKET_COUNT.load(Ordering::Relaxed)
}

/// Get the number of transmits deferred by ring backpressure.
pub fn tx_busy_count() -> u32 {
    TX_BUSY_COUNT.load(Ordering::Relaxed)
}

/// Get the number of TX errors that have occurred.
pub fn tx_error_count() -> u32 {
    TX_ERROR_COUNT.load(Ordering::Relaxed)
}

/// Get the number of packets received.
pub fn rx_packet_count() -> u32 {
    RX_PACKET_COUNT.load(Ordering::Relaxed)
}

/// Get the number of receive faults (corrupt slots).
pub fn rx_error_count() -> u32 {
    RX_ERROR_COUNT.load(Ordering::Relaxed)
}

/// Reset all counters.
pub fn reset_counters() {
    TX_PACKET_COUNT.store(0, Ordering::Relaxed);
    TX_BUSY_COUNT.store(0, Ordering::Relaxed);
    TX_ERROR_COUNT.store(0, Ordering::Relaxed);
    RX_PACKET_COUNT.store(0, Ordering::Relaxed);
    RX_ERROR_COUNT.store(0, Ordering::Relaxed);
}
