//! Inquiry scanning and target-peer matching.
//!
//! Drives the discovery state machine: start a general inquiry, resolve an
//! advertised name out of each result's EIR data, and on the first
//! byte-exact match against the configured target capture the peer and hand
//! control to service discovery.

use tracing::{debug, error, info};

use crate::bt::eir::resolve_name;
use crate::bt::stack::{Command, DeviceProp, InquiryRecord};
use crate::config::ClientConfig;
use crate::session::Session;

/// Discovery controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiscoveryState {
    /// No inquiry has been started.
    #[default]
    Idle,
    /// A general inquiry is running and results are being matched.
    Scanning,
    /// The target peer was found; control has passed to service discovery.
    Matched,
}

impl std::fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Matched => write!(f, "Matched"),
        }
    }
}

/// State machine that locates the target peer via inquiry scanning.
///
/// Consumes inquiry results in stack-delivery order; the first match wins
/// and every later result is ignored. There is no tie-break between
/// multiple devices advertising the target name.
pub struct DiscoveryController {
    state: DiscoveryState,
    target_name: Vec<u8>,
    local_name: String,
    inquiry_duration: u8,
    max_responses: u8,
}

impl DiscoveryController {
    /// Create a controller from the client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            state: DiscoveryState::Idle,
            target_name: config.target_name.clone().into_bytes(),
            local_name: config.local_name.clone(),
            inquiry_duration: config.inquiry_duration,
            max_responses: config.max_responses,
        }
    }

    /// Current state.
    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Begin a discovery cycle.
    ///
    /// Transitions `Idle -> Scanning` and returns the commands to issue:
    /// set our own device name, make this node connectable but not
    /// discoverable, and start a bounded general inquiry.
    pub fn start(&mut self) -> Vec<Command> {
        if self.state != DiscoveryState::Idle {
            debug!("discovery already {}, ignoring start request", self.state);
            return Vec::new();
        }

        info!(
            "starting general inquiry ({} units) for target \"{}\"",
            self.inquiry_duration,
            String::from_utf8_lossy(&self.target_name)
        );

        self.state = DiscoveryState::Scanning;

        vec![
            Command::SetDeviceName(self.local_name.clone()),
            Command::SetScanMode {
                connectable: true,
                discoverable: false,
            },
            Command::StartInquiry {
                duration: self.inquiry_duration,
                max_responses: self.max_responses,
            },
        ]
    }

    /// Note that the inquiry failed to start.
    ///
    /// The failure is reported and the controller returns to `Idle`; no
    /// retry is scheduled.
    pub fn on_inquiry_failed(&mut self, reason: &str) {
        error!("inquiry failed to start: {reason}");
        self.state = DiscoveryState::Idle;
    }

    /// Feed one inquiry result through the matcher.
    ///
    /// While `Scanning`, every EIR property of the record is run through
    /// the name resolver and compared byte-exactly (same length, same
    /// bytes) against the target. On the first match the peer address is
    /// captured into the session, the controller goes `Matched`, and the
    /// returned commands cancel the inquiry and start service discovery.
    /// Non-matching results return no commands and scanning continues.
    pub fn on_inquiry_result(&mut self, record: &InquiryRecord, session: &Session) -> Vec<Command> {
        if self.state != DiscoveryState::Scanning {
            return Vec::new();
        }

        debug!("inquiry result from {}", record.addr);

        for prop in &record.props {
            let DeviceProp::Eir(eir) = prop else {
                continue;
            };

            let Some(name) = resolve_name(eir) else {
                continue;
            };

            if name.as_bytes() == self.target_name.as_slice() {
                info!("matched target peer \"{name}\" at {}", record.addr);
                session.set_matched_peer(record.addr);
                self.state = DiscoveryState::Matched;
                return vec![Command::CancelInquiry, Command::DiscoverServices(record.addr)];
            }
        }

        Vec::new()
    }

    /// Explicitly begin a new discovery cycle.
    ///
    /// The only path that may clear a captured peer: resets the session's
    /// matched peer, returns to `Idle`, and starts over. Never invoked
    /// automatically; disconnects do not re-enter scanning on their own.
    pub fn restart(&mut self, session: &Session) -> Vec<Command> {
        info!("restarting discovery");
        session.clear_matched_peer();
        self.state = DiscoveryState::Idle;
        self.start()
    }
}
