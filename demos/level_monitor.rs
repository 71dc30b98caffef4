//! End-to-end demo against a scripted stack backend.
//!
//! There is no radio here: the backend answers each command with the
//! events a real sender named "Pawpaw" would produce, then streams a few
//! water-level frames and hangs up. Run with:
//!
//! ```text
//! cargo run --example level_monitor
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use waterlink::{
    spawn_reporter, ClientConfig, Command, DeviceProp, InquiryRecord, LinkEvent, PeerAddress,
    Result, ServiceRecord, SppStack, StackStatus, WaterClient,
};

const SENDER_ADDR: [u8; 6] = [0xC8, 0x2E, 0x18, 0x5A, 0x01, 0x6F];

/// Stack backend that plays back a fixed scenario.
struct ScriptedStack {
    events: mpsc::Sender<LinkEvent>,
}

impl ScriptedStack {
    fn bring_up() -> (Self, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel(32);
        (Self { events: tx }, rx)
    }

    /// EIR payload a sender named "Pawpaw" would broadcast.
    fn sender_eir() -> Bytes {
        let name = b"Pawpaw";
        let mut eir = vec![0x02, 0x01, 0x04]; // flags structure
        eir.push(name.len() as u8 + 1);
        eir.push(0x09); // complete local name
        eir.extend_from_slice(name);
        Bytes::from(eir)
    }
}

#[async_trait]
impl SppStack for ScriptedStack {
    async fn execute(&self, command: Command) -> Result<()> {
        let events = self.events.clone();
        match command {
            Command::StartInquiry { .. } => {
                tokio::spawn(async move {
                    // A stranger answers first, then the sender.
                    let stranger = InquiryRecord {
                        addr: PeerAddress::new([1, 2, 3, 4, 5, 6]),
                        props: vec![DeviceProp::Rssi(-70)],
                    };
                    let _ = events.send(LinkEvent::InquiryResult(stranger)).await;

                    tokio::time::sleep(Duration::from_millis(400)).await;
                    let sender = InquiryRecord {
                        addr: PeerAddress::new(SENDER_ADDR),
                        props: vec![DeviceProp::Eir(ScriptedStack::sender_eir())],
                    };
                    let _ = events.send(LinkEvent::InquiryResult(sender)).await;
                });
            }
            Command::DiscoverServices(_) => {
                tokio::spawn(async move {
                    let _ = events
                        .send(LinkEvent::ServicesDiscovered {
                            status: StackStatus::Success,
                            records: vec![ServiceRecord::new(3, "SPP slave")],
                        })
                        .await;
                });
            }
            Command::Connect { .. } => {
                tokio::spawn(async move {
                    let _ = events
                        .send(LinkEvent::Opened {
                            status: StackStatus::Success,
                        })
                        .await;

                    for level in [10u8, 35, 80, 120, 96, 40] {
                        tokio::time::sleep(Duration::from_millis(700)).await;
                        let _ = events.send(LinkEvent::Data(Bytes::from(vec![level]))).await;
                    }

                    let _ = events.send(LinkEvent::Closed { by_remote: true }).await;
                });
            }
            Command::SetDeviceName(_) | Command::SetScanMode { .. } | Command::CancelInquiry => {}
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::default();
    let (stack, events) = ScriptedStack::bring_up();

    let client = WaterClient::new(Arc::new(stack), events, config.clone());
    client.start().await?;

    let reporter = spawn_reporter(client.session(), config.report_interval);

    // Let the scenario play out, reporter ticking alongside.
    tokio::time::sleep(Duration::from_secs(8)).await;

    reporter.abort();
    client.shutdown().await;

    Ok(())
}
