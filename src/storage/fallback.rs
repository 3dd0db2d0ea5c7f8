use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::{MemoryTransferStore, TransferStats, TransferStore};
use crate::core::{BorderHopError, Transfer, TransferLookup, TransferPatch};
use crate::monitoring::BorderHopMetrics;

/// Primary database with an in-memory store behind it.
///
/// Every operation goes to the primary first. When there is no primary, or it
/// fails with anything other than a conflict or validation error, the call is
/// served by the memory store instead. Lookups that miss in the primary also
/// consult memory so records written during an outage stay reachable. A
/// single-record lookup that fails in the primary and misses in memory
/// reports the primary's error rather than "not found".
pub struct FallbackTransferStore {
    primary: Option<Arc<dyn TransferStore>>,
    memory: MemoryTransferStore,
    metrics: Arc<BorderHopMetrics>,
}

impl FallbackTransferStore {
    pub fn new(primary: Option<Arc<dyn TransferStore>>, metrics: Arc<BorderHopMetrics>) -> Self {
        Self { primary, memory: MemoryTransferStore::new(), metrics }
    }

    pub fn memory_only(metrics: Arc<BorderHopMetrics>) -> Self {
        Self::new(None, metrics)
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    fn should_fall_back(err: &anyhow::Error) -> bool {
        match err.downcast_ref::<BorderHopError>() {
            Some(typed) => typed.is_retryable(),
            None => true,
        }
    }

    /// Log and count a primary failure. Errors that must surface come back as `Err`;
    /// the rest are returned as `Ok` for callers that still need them.
    fn degrade(
        &self,
        operation: &'static str,
        backend: &str,
        err: anyhow::Error,
    ) -> Result<anyhow::Error> {
        if !Self::should_fall_back(&err) {
            return Err(err);
        }
        warn!(operation, backend, "Primary storage failed, using in-memory store: {}", err);
        self.metrics.record_fallback(operation);
        Ok(err)
    }

    fn missing_or(primary_err: Option<anyhow::Error>, found: Option<Transfer>) -> Result<Option<Transfer>> {
        match (found, primary_err) {
            (Some(found), _) => Ok(Some(found)),
            (None, Some(err)) => Err(err),
            (None, None) => Ok(None),
        }
    }
}

#[async_trait]
impl TransferStore for FallbackTransferStore {
    fn backend_name(&self) -> &'static str {
        match &self.primary {
            Some(primary) => primary.backend_name(),
            None => self.memory.backend_name(),
        }
    }

    async fn create(&self, transfer: &Transfer) -> Result<()> {
        if let Some(primary) = &self.primary {
            match primary.create(transfer).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.degrade("create", primary.backend_name(), e)?;
                }
            }
        }
        self.memory.create(transfer).await
    }

    async fn find_one(&self, lookup: &TransferLookup) -> Result<Option<Transfer>> {
        let mut primary_err = None;
        if let Some(primary) = &self.primary {
            match primary.find_one(lookup).await {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(e) => primary_err = Some(self.degrade("find_one", primary.backend_name(), e)?),
            }
        }
        let found = self.memory.find_one(lookup).await?;
        Self::missing_or(primary_err, found)
    }

    async fn find_one_and_update(
        &self,
        lookup: &TransferLookup,
        patch: &TransferPatch,
    ) -> Result<Option<Transfer>> {
        let mut primary_err = None;
        if let Some(primary) = &self.primary {
            match primary.find_one_and_update(lookup, patch).await {
                Ok(Some(updated)) => return Ok(Some(updated)),
                Ok(None) => {}
                Err(e) => {
                    primary_err = Some(self.degrade("find_one_and_update", primary.backend_name(), e)?)
                }
            }
        }
        let updated = self.memory.find_one_and_update(lookup, patch).await?;
        Self::missing_or(primary_err, updated)
    }

    async fn find_by_address(&self, address: &str) -> Result<Vec<Transfer>> {
        let mut found = match &self.primary {
            Some(primary) => match primary.find_by_address(address).await {
                Ok(rows) => rows,
                Err(e) => {
                    self.degrade("find_by_address", primary.backend_name(), e)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        found.extend(self.memory.find_by_address(address).await?);
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Transfer>> {
        let mut found = match &self.primary {
            Some(primary) => match primary.recent(limit).await {
                Ok(rows) => rows,
                Err(e) => {
                    self.degrade("recent", primary.backend_name(), e)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        found.extend(self.memory.recent(limit).await?);
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }

    async fn stats(&self) -> Result<TransferStats> {
        let mut stats = match &self.primary {
            Some(primary) => match primary.stats().await {
                Ok(stats) => stats,
                Err(e) => {
                    self.degrade("stats", primary.backend_name(), e)?;
                    TransferStats::default()
                }
            },
            None => TransferStats::default(),
        };
        stats.merge(self.memory.stats().await?);
        Ok(stats)
    }

    async fn count(&self) -> Result<u64> {
        let primary_count = match &self.primary {
            Some(primary) => match primary.count().await {
                Ok(n) => n,
                Err(e) => {
                    self.degrade("count", primary.backend_name(), e)?;
                    0
                }
            },
            None => 0,
        };
        Ok(primary_count + self.memory.count().await?)
    }
}
