use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use muamma_api::session::SessionStore;

/// Background task that drops expired sessions from the store.
pub async fn run_session_purge_loop(sessions: Arc<dyn SessionStore>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match sessions.purge_expired() {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: purged {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Session cleanup error: {}", e);
            }
        }
    }
}
