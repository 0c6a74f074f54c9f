use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::store::Partition;

/// Background task that rewrites a partition's journal once enough appends
/// have accumulated since the last rewrite. Runs for the life of the
/// partition.
pub async fn run_compactor(partition: Arc<Partition>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = match partition.journal_appends_since_compact().await {
            Ok(n) => n,
            Err(e) => {
                debug!(sync_key = partition.sync_key(), "compactor stopping: {e}");
                return;
            }
        };
        if appends < threshold {
            continue;
        }
        match partition.compact_journal().await {
            Ok(()) => info!(sync_key = partition.sync_key(), appends, "journal compacted"),
            Err(e) => debug!(sync_key = partition.sync_key(), "compaction failed: {e}"),
        }
    }
}
