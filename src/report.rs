//! Periodic session reporting.
//!
//! The reporter is the read side of the session: on a fixed interval it
//! takes a snapshot and surfaces the link status and latest sample. It
//! never mutates the session; only [`Session::snapshot`] is reachable
//! from here.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::session::Session;

/// Spawn the periodic reporter task.
///
/// Runs until the returned handle is aborted. Each tick logs either the
/// latest water level or that no server is connected.
pub fn spawn_reporter(session: Session, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let snap = session.snapshot();
            if snap.connected {
                info!("water level: {}", snap.latest_level);
            } else {
                info!("not connected to server");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reporter_only_reads() {
        let session = Session::new();
        session.record_level(17);

        let handle = spawn_reporter(session.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.abort();

        // Several ticks later the record is untouched.
        let snap = session.snapshot();
        assert_eq!(snap.latest_level, 17);
        assert!(!snap.connected);
        assert_eq!(snap.matched_peer, None);
    }
}
