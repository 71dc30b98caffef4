//! The seam between the client core and the Bluetooth Classic stack backend.
//!
//! The radio and protocol stack live outside this crate. A backend hands the
//! client a stream of [`LinkEvent`]s over an `mpsc` channel and accepts
//! [`Command`]s through the [`SppStack`] trait. Events for a single link are
//! expected in the order the underlying stack produced them.

use async_trait::async_trait;
use bytes::Bytes;

use crate::bt::service::ServiceRecord;
use crate::error::Result;

/// A fixed 6-byte BR/EDR hardware address.
///
/// Opaque beyond equality; displayed in the usual colon-separated hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerAddress([u8; 6]);

impl PeerAddress {
    /// Length of a BR/EDR device address in bytes.
    pub const LEN: usize = 6;

    /// Create an address from its raw bytes.
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// One typed property blob attached to an inquiry result.
///
/// Only the EIR property is consumed by the core; the rest are carried for
/// completeness and ignored.
#[derive(Debug, Clone)]
pub enum DeviceProp {
    /// Extended Inquiry Response payload.
    Eir(Bytes),
    /// Class-of-device word.
    ClassOfDevice(u32),
    /// Received signal strength in dBm.
    Rssi(i8),
}

/// One inquiry scan result: a peer address plus its property blobs.
///
/// Records are transient; they are dropped as soon as matching has been
/// attempted against them.
#[derive(Debug, Clone)]
pub struct InquiryRecord {
    /// Address of the responding device.
    pub addr: PeerAddress,
    /// Properties delivered with the result, in stack order.
    pub props: Vec<DeviceProp>,
}

/// Completion status reported by the stack for an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    /// The operation completed successfully.
    Success,
    /// The operation failed with a backend status code.
    Failure(u8),
}

impl StackStatus {
    /// Check for success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure(code) => write!(f, "failure ({code})"),
        }
    }
}

/// Asynchronous link events delivered by the stack backend.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A device answered the inquiry scan.
    InquiryResult(InquiryRecord),
    /// The bounded inquiry window elapsed.
    InquiryComplete,
    /// Authentication with a peer finished.
    AuthComplete {
        /// Whether authentication succeeded.
        success: bool,
        /// Name the peer reported during pairing.
        peer_name: String,
    },
    /// SPP service discovery against the matched peer finished.
    ServicesDiscovered {
        /// Completion status.
        status: StackStatus,
        /// Discovered service records; empty on failure.
        records: Vec<ServiceRecord>,
    },
    /// An outgoing connection attempt finished.
    Opened {
        /// Completion status.
        status: StackStatus,
    },
    /// The data channel closed, locally or by the remote peer.
    Closed {
        /// Whether the remote side initiated the close.
        by_remote: bool,
    },
    /// Inbound bytes arrived on the open channel.
    Data(Bytes),
}

/// Commands the client core issues to the stack backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set this node's own advertised device name.
    SetDeviceName(String),
    /// Set this node's visibility.
    SetScanMode {
        /// Whether peers may connect to this node.
        connectable: bool,
        /// Whether this node answers inquiry scans.
        discoverable: bool,
    },
    /// Start a general inquiry.
    StartInquiry {
        /// Duration in 1.28 s units.
        duration: u8,
        /// Maximum responses; 0 means unlimited.
        max_responses: u8,
    },
    /// Cancel an inquiry in progress.
    CancelInquiry,
    /// Enumerate SPP services on a peer.
    DiscoverServices(PeerAddress),
    /// Open an SPP channel on a peer, acting as initiator with no
    /// security requirement.
    Connect {
        /// Address of the matched peer.
        addr: PeerAddress,
        /// Service channel number selected by service discovery.
        channel: u8,
    },
}

/// Command interface of a Bluetooth Classic stack backend.
///
/// The backend contract: SPP transport runs in enhanced mode with
/// retransmission enabled, and link events are delivered on the `mpsc`
/// channel handed out alongside the backend. `execute` must not block;
/// a rejected command is reported through the returned error and the
/// affected flow stalls without retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SppStack: Send + Sync {
    /// Issue one command to the backend.
    async fn execute(&self, command: Command) -> Result<()>;
}
