use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use donations_api::AppState;

/// Background task that purges ledgers abandoned for longer than
/// `retention_hours`.
pub async fn run_retention_loop(state: AppState, retention_hours: u64, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    let max_age = chrono::Duration::hours(retention_hours as i64);

    loop {
        interval.tick().await;

        let app = Arc::clone(&state);
        let result = tokio::task::spawn_blocking(move || app.ledger.purge_abandoned(max_age)).await;
        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Cleanup: purged {} abandoned donation record(s)", count);
                }
            }
            Ok(Err(e)) => warn!("Cleanup error: {}", e),
            Err(e) => warn!("Cleanup task failed: {}", e),
        }
    }
}
