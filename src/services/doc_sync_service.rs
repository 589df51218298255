use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info};

use crate::services::content_store::{ContentStore, SyncReport};

/// Start the periodic cache -> durable sweep. The first sweep runs one interval after start.
pub fn spawn_doc_sync(store: Arc<ContentStore>, interval: Duration) -> JoinHandle<()> {
    info!("Background document sync every {:?}", interval);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            run_sweep(&store).await;
        }
    })
}

/// One sweep. Failures are logged, never propagated.
pub async fn run_sweep(store: &ContentStore) -> SyncReport {
    match store.sync_to_durable().await {
        Ok(report) => {
            info!("Synced {} documents with the durable tier ({} failed)", report.synced, report.failed);
            report
        }
        Err(e) => {
            error!("Document sync skipped, could not list cached documents: {}", e);
            SyncReport::default()
        }
    }
}
