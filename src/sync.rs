use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::compactor;
use crate::limits::{MAX_PARTITIONS, MAX_SYNC_KEY_LEN};
use crate::store::Partition;

/// Manages per-sync-key partitions. Offices sharing a sync key see one data
/// set; different keys are fully isolated, each with its own journal and
/// compactor.
pub struct SyncManager {
    partitions: DashMap<String, Arc<Partition>>,
    data_dir: PathBuf,
    compact_threshold: u64,
}

impl SyncManager {
    pub fn new(data_dir: PathBuf, compact_threshold: u64) -> Self {
        Self {
            partitions: DashMap::new(),
            data_dir,
            compact_threshold,
        }
    }

    /// Get or lazily create the partition for `sync_key`.
    pub fn get_or_create(&self, sync_key: &str) -> std::io::Result<Arc<Partition>> {
        if let Some(partition) = self.partitions.get(sync_key) {
            return Ok(partition.value().clone());
        }
        if sync_key.len() > MAX_SYNC_KEY_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "sync key too long",
            ));
        }
        if self.partitions.len() >= MAX_PARTITIONS {
            return Err(std::io::Error::other("too many partitions"));
        }

        // Sanitize the key before using it as a filename.
        let safe_name: String = sync_key
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if safe_name.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty sync key",
            ));
        }

        let journal_path = self.data_dir.join(format!("{safe_name}.journal"));
        let partition = Arc::new(Partition::open(sync_key, journal_path)?);

        let compactor_partition = partition.clone();
        let threshold = self.compact_threshold;
        tokio::spawn(async move {
            compactor::run_compactor(compactor_partition, threshold).await;
        });

        self.partitions.insert(sync_key.to_string(), partition.clone());
        info!(sync_key, partitions = self.partitions.len(), "partition opened");
        Ok(partition)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}
