//! # waterlink
//!
//! A Bluetooth Classic (BR/EDR) client that locates one named peer by
//! inquiry scanning, opens a Serial Port Profile channel to it, and
//! ingests a stream of single-byte water-level readings.
//!
//! The flow, driven entirely by link events from a stack backend:
//!
//! 1. **Discovery** - general inquiry; every result's EIR data is parsed
//!    for an advertised name and compared byte-exactly against the target.
//! 2. **Match** - the first match wins: the inquiry is cancelled and SPP
//!    service discovery starts against the captured peer.
//! 3. **Connect** - the first discovered service channel is opened as
//!    initiator with no security requirement.
//! 4. **Ingest** - one-byte frames update the shared session record;
//!    frames of any other length are dropped.
//!
//! The radio stack itself is not part of this crate: a backend implements
//! [`SppStack`] and feeds [`LinkEvent`]s over an `mpsc` channel. The
//! shared [`Session`] is safe to read from any task via
//! [`Session::snapshot`]; the periodic reporter in [`report`] is the
//! canonical reader.
//!
//! ## Quick start
//!
//! Parsing a name out of raw EIR data:
//!
//! ```rust
//! use waterlink::resolve_name;
//!
//! // [len][type 0x09 = complete local name]["Pawpaw"]
//! let eir = [0x07, 0x09, b'P', b'a', b'w', b'p', b'a', b'w'];
//! let name = resolve_name(&eir).unwrap();
//! assert_eq!(name.as_bytes(), b"Pawpaw");
//! ```
//!
//! Wiring a client to a backend:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use waterlink::{spawn_reporter, ClientConfig, WaterClient};
//!
//! let config = ClientConfig::default();
//! // `backend` is your stack implementation of `SppStack`; it hands out
//! // the link-event receiver at construction.
//! let (backend, events) = my_stack::bring_up()?;
//!
//! let client = WaterClient::new(Arc::new(backend), events, config.clone());
//! client.start().await?;
//! let reporter = spawn_reporter(client.session(), config.report_interval);
//! ```
//!
//! ## Feature flags
//!
//! - `serde`: enable serialization for the plain data types

// Public modules
pub mod bootstrap;
pub mod bt;
pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod session;

// Re-exports for convenience
pub use bootstrap::{init_storage, Storage};
pub use client::{ClientEvent, WaterClient};
pub use config::{
    ClientConfig, DEFAULT_INQUIRY_DURATION, DEFAULT_LOCAL_NAME, DEFAULT_TARGET_NAME,
};
pub use error::{Error, Result, StorageError};
pub use report::spawn_reporter;
pub use session::{Session, SessionSnapshot};

// Re-export commonly used types from submodules
pub use bt::connection::ConnectionState;
pub use bt::discovery::DiscoveryState;
pub use bt::eir::{resolve_name, ResolvedName, MAX_DEVICE_NAME_LEN};
pub use bt::service::{select_service, ServiceRecord};
pub use bt::stack::{
    Command, DeviceProp, InquiryRecord, LinkEvent, PeerAddress, SppStack, StackStatus,
};
