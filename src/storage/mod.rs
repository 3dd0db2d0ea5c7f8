use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config::StorageConfig;
use crate::core::{Transfer, TransferLookup, TransferPatch};

mod fallback;
mod memory;
mod sqlite;

pub use fallback::FallbackTransferStore;
pub use memory::MemoryTransferStore;
pub use sqlite::SqliteTransferStore;

/// Aggregates over every stored transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    pub total_transfers: u64,
    pub total_volume: f64,
    pub total_fees: f64,
    pub by_destination_chain: BTreeMap<String, u64>,
    pub by_intent: BTreeMap<String, u64>,
}

impl TransferStats {
    pub fn from_transfers<'a>(transfers: impl IntoIterator<Item = &'a Transfer>) -> Self {
        let mut stats = TransferStats::default();
        for t in transfers {
            stats.total_transfers += 1;
            stats.total_volume += t.amount;
            stats.total_fees += t.estimated_fees;
            *stats.by_destination_chain.entry(t.destination_chain.clone()).or_insert(0) += 1;
            *stats.by_intent.entry(t.intent.as_str().to_string()).or_insert(0) += 1;
        }
        stats
    }

    pub fn merge(&mut self, other: TransferStats) {
        self.total_transfers += other.total_transfers;
        self.total_volume += other.total_volume;
        self.total_fees += other.total_fees;
        for (chain, n) in other.by_destination_chain {
            *self.by_destination_chain.entry(chain).or_insert(0) += n;
        }
        for (intent, n) in other.by_intent {
            *self.by_intent.entry(intent).or_insert(0) += n;
        }
    }
}

/// Persistence for transfer records.
///
/// `find_one_and_update` refuses patches that move a terminal transfer to a
/// different status and reports them as `BorderHopError::ConflictError`.
#[async_trait]
pub trait TransferStore: Send + Sync {
    fn backend_name(&self) -> &'static str;
    async fn create(&self, transfer: &Transfer) -> Result<()>;
    async fn find_one(&self, lookup: &TransferLookup) -> Result<Option<Transfer>>;
    async fn find_one_and_update(
        &self,
        lookup: &TransferLookup,
        patch: &TransferPatch,
    ) -> Result<Option<Transfer>>;
    /// Transfers sent or received by `address`, newest first.
    async fn find_by_address(&self, address: &str) -> Result<Vec<Transfer>>;
    async fn recent(&self, limit: usize) -> Result<Vec<Transfer>>;
    async fn stats(&self) -> Result<TransferStats>;
    async fn count(&self) -> Result<u64>;
}

/// Delay before retry `attempt` (1-based): `min(1000 * 2^(attempt-1), cap)` ms.
pub fn backoff_delay(attempt: u32, cap_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(1000u64.saturating_mul(factor).min(cap_ms))
}

/// Connect to the configured primary database, retrying with exponential backoff.
/// `None` means the service runs on the in-memory store alone.
pub async fn connect_with_retry(config: &StorageConfig) -> Option<SqliteTransferStore> {
    let url = match config.database_url.as_deref() {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            info!("No database configured, using in-memory transfer storage");
            return None;
        }
    };

    let attempts = config.connect_attempts.max(1);
    for attempt in 1..=attempts {
        match SqliteTransferStore::connect(url, config.max_connections).await {
            Ok(store) => {
                info!(attempt, "Connected to transfer database");
                return Some(store);
            }
            Err(e) => {
                warn!(attempt, max_attempts = attempts, "Database connection failed: {}", e);
                if attempt < attempts {
                    let delay = backoff_delay(attempt, config.backoff_cap_ms);
                    info!("Retrying database connection in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    error!("Database unavailable after {} attempts, continuing with in-memory storage", attempts);
    None
}
