//! Client orchestration.
//!
//! [`WaterClient`] owns the stack seam and the per-link state machines,
//! and runs the event loop that routes every [`LinkEvent`] to the
//! component that consumes it. The flow is the one the sender expects:
//! inquiry scan, match the advertised name, resolve SPP services, connect
//! to the first channel, then ingest one-byte level frames.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::bt::connection::{ConnectionManager, ConnectionState};
use crate::bt::discovery::{DiscoveryController, DiscoveryState};
use crate::bt::service;
use crate::bt::stack::{Command, LinkEvent, PeerAddress, SppStack};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::session::{Session, SessionSnapshot};

/// Notifications emitted as the link progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Discovery captured the target peer.
    PeerMatched(PeerAddress),
    /// The SPP channel opened.
    Connected,
    /// The SPP channel closed.
    Disconnected,
    /// A water-level sample was ingested.
    Level(u8),
}

/// Bluetooth Classic SPP client for the water-level sender.
///
/// Construct with a stack backend and its event stream, then [`start`]
/// to begin discovery. The shared [`Session`] is readable at any time via
/// [`snapshot`]; subscribers receive [`ClientEvent`]s as the link moves.
///
/// [`start`]: WaterClient::start
/// [`snapshot`]: WaterClient::snapshot
pub struct WaterClient {
    /// Stack backend commands are issued through.
    stack: Arc<dyn SppStack>,
    /// Discovery state machine.
    discovery: Arc<RwLock<DiscoveryController>>,
    /// Connection state machine.
    connection: Arc<RwLock<ConnectionManager>>,
    /// Shared session record.
    session: Session,
    /// Channel for client events.
    event_tx: broadcast::Sender<ClientEvent>,
    /// Link-event stream, consumed by the loop on start.
    events: RwLock<Option<mpsc::Receiver<LinkEvent>>>,
    /// Handle to the event-loop task.
    loop_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    /// Running flag.
    is_running: Arc<AtomicBool>,
}

impl WaterClient {
    /// Create a client over a stack backend and its link-event stream.
    pub fn new(
        stack: Arc<dyn SppStack>,
        events: mpsc::Receiver<LinkEvent>,
        config: ClientConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(32);

        Self {
            stack,
            discovery: Arc::new(RwLock::new(DiscoveryController::new(&config))),
            connection: Arc::new(RwLock::new(ConnectionManager::new())),
            session: Session::new(),
            event_tx,
            events: RwLock::new(Some(events)),
            loop_handle: RwLock::new(None),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Begin discovery and start the event loop.
    ///
    /// Issues the discovery start commands (own name, scan mode, general
    /// inquiry) and spawns the dispatch task. If the inquiry fails to
    /// start, the failure is reported and discovery stays `Idle`; the
    /// loop still runs so an explicit
    /// [`restart_discovery`](WaterClient::restart_discovery) can try again.
    pub async fn start(&self) -> Result<()> {
        if self.is_running.load(Ordering::SeqCst) {
            debug!("client already running");
            return Ok(());
        }

        let Some(mut rx) = self.events.write().take() else {
            return Err(Error::Internal(
                "link-event stream already consumed".to_string(),
            ));
        };

        info!("starting water-level client");
        self.is_running.store(true, Ordering::SeqCst);

        let commands = self.discovery.write().start();
        Self::execute_all(&self.stack, &self.discovery, commands).await;

        let stack = self.stack.clone();
        let discovery = self.discovery.clone();
        let connection = self.connection.clone();
        let session = self.session.clone();
        let event_tx = self.event_tx.clone();
        let is_running = self.is_running.clone();

        let handle = tokio::spawn(async move {
            while is_running.load(Ordering::SeqCst) {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(event) => {
                            Self::handle_event(
                                event,
                                &stack,
                                &discovery,
                                &connection,
                                &session,
                                &event_tx,
                            ).await;
                        }
                        None => {
                            warn!("stack event stream closed");
                            break;
                        }
                    },
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        // Re-check the running flag.
                    }
                }
            }

            debug!("client event loop ended");
        });

        *self.loop_handle.write() = Some(handle);

        Ok(())
    }

    /// Stop the event loop.
    pub async fn shutdown(&self) {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("shutting down water-level client");

        if let Some(handle) = self.loop_handle.write().take() {
            let _ = handle.await;
        }
    }

    /// Explicitly begin a new discovery cycle.
    ///
    /// Clears the matched peer and scans again. This is the only path
    /// back to `Scanning`; a closed channel never triggers it on its own.
    pub async fn restart_discovery(&self) {
        let commands = self.discovery.write().restart(&self.session);
        Self::execute_all(&self.stack, &self.discovery, commands).await;
    }

    /// Handle to the shared session record.
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    /// A consistent copy of the session record.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Current discovery state.
    pub fn discovery_state(&self) -> DiscoveryState {
        self.discovery.read().state()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.read().state()
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Check if the event loop is running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Route one link event to the component that consumes it.
    async fn handle_event(
        event: LinkEvent,
        stack: &Arc<dyn SppStack>,
        discovery: &Arc<RwLock<DiscoveryController>>,
        connection: &Arc<RwLock<ConnectionManager>>,
        session: &Session,
        event_tx: &broadcast::Sender<ClientEvent>,
    ) {
        match event {
            LinkEvent::InquiryResult(record) => {
                let addr = record.addr;
                let commands = discovery.write().on_inquiry_result(&record, session);
                if !commands.is_empty() {
                    let _ = event_tx.send(ClientEvent::PeerMatched(addr));
                }
                Self::execute_all(stack, discovery, commands).await;
            }
            LinkEvent::InquiryComplete => {
                debug!("inquiry window elapsed");
            }
            LinkEvent::AuthComplete { success, peer_name } => {
                if success {
                    info!("authentication success: {peer_name}");
                } else {
                    error!("authentication failed: {peer_name}");
                }
            }
            LinkEvent::ServicesDiscovered { status, records } => {
                let selected = service::on_services_discovered(status, &records).cloned();
                let Some(record) = selected else {
                    return;
                };

                let Some(addr) = session.snapshot().matched_peer else {
                    warn!("services discovered but no peer is matched");
                    return;
                };

                let command = connection.write().open(addr, record.channel);
                if let Some(command) = command {
                    if let Err(e) = stack.execute(command).await {
                        error!("connect request rejected: {e}");
                    }
                }
            }
            LinkEvent::Opened { status } => {
                if connection.write().on_opened(status, session) {
                    let _ = event_tx.send(ClientEvent::Connected);
                }
            }
            LinkEvent::Closed { by_remote } => {
                connection.write().on_closed(by_remote, session);
                let _ = event_tx.send(ClientEvent::Disconnected);
            }
            LinkEvent::Data(payload) => {
                if let Some(level) = ingest_frame(session, &payload) {
                    let _ = event_tx.send(ClientEvent::Level(level));
                }
            }
        }
    }

    /// Issue a batch of commands, reporting failures.
    ///
    /// A rejected inquiry start drops discovery back to `Idle`; every
    /// other rejection is reported and the flow stalls where it is.
    async fn execute_all(
        stack: &Arc<dyn SppStack>,
        discovery: &Arc<RwLock<DiscoveryController>>,
        commands: Vec<Command>,
    ) {
        for command in commands {
            let is_inquiry_start = matches!(command, Command::StartInquiry { .. });
            if let Err(e) = stack.execute(command).await {
                if is_inquiry_start {
                    discovery.write().on_inquiry_failed(&e.to_string());
                } else {
                    error!("stack command failed: {e}");
                }
            }
        }
    }
}

impl Drop for WaterClient {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}

/// Ingest one inbound frame.
///
/// A frame of exactly one byte is a water-level reading and updates the
/// session; any other length is dropped without touching the last known
/// good sample.
pub(crate) fn ingest_frame(session: &Session, payload: &[u8]) -> Option<u8> {
    if payload.len() != 1 {
        trace!("dropping {}-byte frame", payload.len());
        return None;
    }

    let level = payload[0];
    session.record_level(level);
    info!("water level: {level}");
    Some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bt::service::ServiceRecord;
    use crate::bt::stack::{DeviceProp, InquiryRecord, MockSppStack, StackStatus};
    use bytes::Bytes;
    use mockall::predicate::eq;

    const PEER: [u8; 6] = [0xAA, 0xBB, 0xCC, 0x11, 0x22, 0x33];

    fn matching_record() -> InquiryRecord {
        let mut eir = vec![b"Pawpaw".len() as u8 + 1, 0x09];
        eir.extend_from_slice(b"Pawpaw");
        InquiryRecord {
            addr: PeerAddress::new(PEER),
            props: vec![DeviceProp::Eir(Bytes::from(eir))],
        }
    }

    struct Harness {
        stack: Arc<dyn SppStack>,
        discovery: Arc<RwLock<DiscoveryController>>,
        connection: Arc<RwLock<ConnectionManager>>,
        session: Session,
        event_tx: broadcast::Sender<ClientEvent>,
    }

    impl Harness {
        fn new(mock: MockSppStack) -> (Self, broadcast::Receiver<ClientEvent>) {
            let (event_tx, event_rx) = broadcast::channel(32);
            let harness = Self {
                stack: Arc::new(mock),
                discovery: Arc::new(RwLock::new(DiscoveryController::new(
                    &ClientConfig::default(),
                ))),
                connection: Arc::new(RwLock::new(ConnectionManager::new())),
                session: Session::new(),
                event_tx,
            };
            (harness, event_rx)
        }

        async fn dispatch(&self, event: LinkEvent) {
            WaterClient::handle_event(
                event,
                &self.stack,
                &self.discovery,
                &self.connection,
                &self.session,
                &self.event_tx,
            )
            .await;
        }
    }

    #[tokio::test]
    async fn test_match_cancels_inquiry_and_discovers_services() {
        let mut mock = MockSppStack::new();
        mock.expect_execute()
            .with(eq(Command::CancelInquiry))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_execute()
            .with(eq(Command::DiscoverServices(PeerAddress::new(PEER))))
            .times(1)
            .returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.discovery.write().start();

        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;

        assert_eq!(harness.discovery.read().state(), DiscoveryState::Matched);
        assert_eq!(
            harness.session.snapshot().matched_peer,
            Some(PeerAddress::new(PEER))
        );
    }

    #[tokio::test]
    async fn test_services_discovered_connects_to_first_channel() {
        let mut mock = MockSppStack::new();
        mock.expect_execute()
            .with(eq(Command::Connect {
                addr: PeerAddress::new(PEER),
                channel: 5,
            }))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_execute().returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.discovery.write().start();
        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;

        harness
            .dispatch(LinkEvent::ServicesDiscovered {
                status: StackStatus::Success,
                records: vec![
                    ServiceRecord::new(5, "SPP slave"),
                    ServiceRecord::new(9, "other"),
                    ServiceRecord::new(1, "another"),
                ],
            })
            .await;

        assert_eq!(
            harness.connection.read().state(),
            ConnectionState::Connecting
        );
    }

    #[tokio::test]
    async fn test_empty_service_list_stalls() {
        let mut mock = MockSppStack::new();
        // Cancel + discover only; no connect may be issued.
        mock.expect_execute().times(2).returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.discovery.write().start();
        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;

        harness
            .dispatch(LinkEvent::ServicesDiscovered {
                status: StackStatus::Success,
                records: vec![],
            })
            .await;

        assert_eq!(
            harness.connection.read().state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_service_discovery_failure_stalls() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().times(2).returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.discovery.write().start();
        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;

        harness
            .dispatch(LinkEvent::ServicesDiscovered {
                status: StackStatus::Failure(7),
                records: vec![],
            })
            .await;

        assert_eq!(
            harness.connection.read().state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_full_flow_and_event_sequence() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|_| Ok(()));

        let (harness, mut event_rx) = Harness::new(mock);
        harness.discovery.write().start();

        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;
        harness
            .dispatch(LinkEvent::AuthComplete {
                success: true,
                peer_name: "Pawpaw".to_string(),
            })
            .await;
        harness
            .dispatch(LinkEvent::ServicesDiscovered {
                status: StackStatus::Success,
                records: vec![ServiceRecord::new(3, "SPP slave")],
            })
            .await;
        harness
            .dispatch(LinkEvent::Opened {
                status: StackStatus::Success,
            })
            .await;
        harness
            .dispatch(LinkEvent::Data(Bytes::from_static(&[42])))
            .await;
        harness
            .dispatch(LinkEvent::Closed { by_remote: true })
            .await;

        let snap = harness.session.snapshot();
        assert_eq!(snap.matched_peer, Some(PeerAddress::new(PEER)));
        assert!(!snap.connected);
        assert_eq!(snap.latest_level, 42);

        assert_eq!(
            event_rx.recv().await.unwrap(),
            ClientEvent::PeerMatched(PeerAddress::new(PEER))
        );
        assert_eq!(event_rx.recv().await.unwrap(), ClientEvent::Connected);
        assert_eq!(event_rx.recv().await.unwrap(), ClientEvent::Level(42));
        assert_eq!(event_rx.recv().await.unwrap(), ClientEvent::Disconnected);
    }

    #[tokio::test]
    async fn test_failed_open_reports_and_stalls() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.discovery.write().start();
        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;
        harness
            .dispatch(LinkEvent::ServicesDiscovered {
                status: StackStatus::Success,
                records: vec![ServiceRecord::new(3, "SPP slave")],
            })
            .await;
        harness
            .dispatch(LinkEvent::Opened {
                status: StackStatus::Failure(2),
            })
            .await;

        assert_eq!(
            harness.connection.read().state(),
            ConnectionState::Disconnected
        );
        assert!(!harness.session.snapshot().connected);
    }

    #[tokio::test]
    async fn test_wrong_length_frames_are_dropped() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.session.record_level(7);

        harness.dispatch(LinkEvent::Data(Bytes::new())).await;
        harness
            .dispatch(LinkEvent::Data(Bytes::from_static(&[1, 2])))
            .await;

        assert_eq!(harness.session.snapshot().latest_level, 7);
    }

    #[tokio::test]
    async fn test_start_issues_discovery_commands() {
        let seen: Arc<RwLock<Vec<Command>>> = Arc::new(RwLock::new(Vec::new()));
        let sink = seen.clone();

        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(move |command| {
            sink.write().push(command);
            Ok(())
        });

        let (_tx, rx) = mpsc::channel(8);
        let client = WaterClient::new(Arc::new(mock), rx, ClientConfig::default());

        client.start().await.unwrap();
        assert!(client.is_running());
        assert_eq!(client.discovery_state(), DiscoveryState::Scanning);
        assert_eq!(
            *seen.read(),
            vec![
                Command::SetDeviceName("tron-receiver".to_string()),
                Command::SetScanMode {
                    connectable: true,
                    discoverable: false,
                },
                Command::StartInquiry {
                    duration: 30,
                    max_responses: 0,
                },
            ]
        );

        client.shutdown().await;
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn test_inquiry_start_failure_returns_to_idle() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|command| {
            if matches!(command, Command::StartInquiry { .. }) {
                Err(Error::CommandFailed {
                    reason: "controller busy".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let (_tx, rx) = mpsc::channel(8);
        let client = WaterClient::new(Arc::new(mock), rx, ClientConfig::default());

        client.start().await.unwrap();
        assert_eq!(client.discovery_state(), DiscoveryState::Idle);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_loop_dispatches_events_from_stack() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|_| Ok(()));

        let (tx, rx) = mpsc::channel(8);
        let client = WaterClient::new(Arc::new(mock), rx, ClientConfig::default());
        client.start().await.unwrap();

        tx.send(LinkEvent::InquiryResult(matching_record()))
            .await
            .unwrap();

        // Wait for the loop to pick the event up.
        for _ in 0..100 {
            if client.snapshot().matched_peer.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            client.snapshot().matched_peer,
            Some(PeerAddress::new(PEER))
        );
        assert_eq!(client.discovery_state(), DiscoveryState::Matched);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_start_is_ignored() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|_| Ok(()));

        let (_tx, rx) = mpsc::channel(8);
        let client = WaterClient::new(Arc::new(mock), rx, ClientConfig::default());

        client.start().await.unwrap();
        client.start().await.unwrap();

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_discovery_clears_peer_and_rescans() {
        let mut mock = MockSppStack::new();
        mock.expect_execute().returning(|_| Ok(()));

        let (harness, _event_rx) = Harness::new(mock);
        harness.discovery.write().start();
        harness
            .dispatch(LinkEvent::InquiryResult(matching_record()))
            .await;
        assert!(harness.session.snapshot().matched_peer.is_some());

        let commands = harness.discovery.write().restart(&harness.session);
        assert_eq!(commands.len(), 3);
        assert_eq!(harness.session.snapshot().matched_peer, None);
        assert_eq!(harness.discovery.read().state(), DiscoveryState::Scanning);
    }
}
