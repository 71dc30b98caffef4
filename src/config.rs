//! Client configuration.

use std::time::Duration;

/// Name of the peer device the client searches for during inquiry.
pub const DEFAULT_TARGET_NAME: &str = "Pawpaw";

/// Name this node advertises about itself.
pub const DEFAULT_LOCAL_NAME: &str = "tron-receiver";

/// Inquiry duration in 1.28 s units.
pub const DEFAULT_INQUIRY_DURATION: u8 = 30;

/// Configuration for a [`WaterClient`](crate::WaterClient).
///
/// The defaults reproduce the deployed receiver: it looks for a sender
/// named "Pawpaw", identifies itself as "tron-receiver", scans for 30
/// inquiry units with unlimited responses, and reports once per second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Advertised name of the peer to match, compared byte-for-byte.
    pub target_name: String,
    /// Device name this node sets for itself before scanning.
    pub local_name: String,
    /// General inquiry duration in 1.28 s units.
    pub inquiry_duration: u8,
    /// Maximum inquiry responses; 0 means unlimited.
    pub max_responses: u8,
    /// Interval at which the reporter surfaces the session state.
    pub report_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            inquiry_duration: DEFAULT_INQUIRY_DURATION,
            max_responses: 0,
            report_interval: Duration::from_secs(1),
        }
    }
}
