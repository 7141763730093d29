//! Driver error types

use core::fmt;

/// Initialization errors.
///
/// Reported once from `EthIpCore::init`; every variant is preceded by a full
/// rollback of whatever was acquired before the failing step. Fatal to
/// bringing the device up, not to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Reserving or mapping the MMIO register window failed.
    RegionMap,
    /// Allocating or mapping the DMA ring buffer failed.
    DmaAlloc,
    /// Claiming the interrupt line failed.
    IrqClaim,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionMap => write!(f, "failed to map register window"),
            Self::DmaAlloc => write!(f, "failed to allocate DMA ring buffer"),
            Self::IrqClaim => write!(f, "failed to claim interrupt line"),
        }
    }
}

/// TX error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// TX ring is momentarily full; transient backpressure, try again later.
    Busy,
    /// Frame exceeds the slot payload capacity.
    FrameTooLarge,
    /// Device not initialized.
    DeviceNotReady,
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "transmit ring full"),
            Self::FrameTooLarge => write!(f, "frame exceeds slot capacity"),
            Self::DeviceNotReady => write!(f, "device not initialized"),
        }
    }
}

/// RX error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// Provided buffer too small for the pending frame.
    BufferTooSmall {
        /// Required buffer size.
        needed: usize,
    },
    /// Hardware-supplied frame length exceeds the slot bounds. The frame is
    /// dropped and the slot acknowledged; the raw bytes are never exposed.
    CorruptSlot,
    /// Device not initialized.
    DeviceNotReady,
}

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { needed } => {
                write!(f, "receive buffer too small, need {} bytes", needed)
            }
            Self::CorruptSlot => write!(f, "corrupt slot length from hardware"),
            Self::DeviceNotReady => write!(f, "device not initialized"),
        }
    }
}
