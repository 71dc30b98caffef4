//! SPP service records and the channel selection policy.

use crate::bt::stack::StackStatus;
use tracing::{info, warn};

/// One SPP service advertised by a peer, as reported by service discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceRecord {
    /// Service channel number used to open the channel.
    pub channel: u8,
    /// Human-readable service name; not inspected by the selection policy.
    pub name: String,
}

impl ServiceRecord {
    /// Create a new service record.
    pub fn new(channel: u8, name: impl Into<String>) -> Self {
        Self {
            channel,
            name: name.into(),
        }
    }
}

/// Select the service to connect to from a discovery result.
///
/// Policy: the first record wins unconditionally; the service name is not
/// inspected. An empty list yields `None` and no connection is attempted.
pub fn select_service(records: &[ServiceRecord]) -> Option<&ServiceRecord> {
    records.first()
}

/// Log a service-discovery completion the way the stack reports it.
///
/// Returns the selected record on a successful, non-empty result.
pub(crate) fn on_services_discovered(
    status: StackStatus,
    records: &[ServiceRecord],
) -> Option<&ServiceRecord> {
    if !status.is_success() {
        warn!("service discovery failed: {status}");
        return None;
    }

    info!("service discovery complete, {} record(s)", records.len());
    for (index, record) in records.iter().enumerate() {
        info!(
            "-- [{index}] channel {} service {}",
            record.channel, record.name
        );
    }

    let selected = select_service(records);
    if selected.is_none() {
        warn!("peer advertises no SPP services, not connecting");
    }
    selected
}
