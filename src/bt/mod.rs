//! Bluetooth Classic (BR/EDR) plumbing.
//!
//! This module holds the discovery, service-selection, and connection
//! state machines together with the EIR parser and the command/event seam
//! to the external stack backend.

pub mod connection;
pub mod discovery;
pub mod eir;
pub mod service;
pub mod stack;

pub use connection::{ConnectionManager, ConnectionState};
pub use discovery::{DiscoveryController, DiscoveryState};
pub use eir::{resolve_name, ResolvedName, MAX_DEVICE_NAME_LEN};
pub use service::{select_service, ServiceRecord};
pub use stack::{
    Command, DeviceProp, InquiryRecord, LinkEvent, PeerAddress, SppStack, StackStatus,
};
