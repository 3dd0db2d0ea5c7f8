use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{TransferStats, TransferStore};
use crate::core::{BorderHopError, Transfer, TransferLookup, TransferPatch};

/// Process-local transfer map. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTransferStore {
    transfers: RwLock<HashMap<String, Transfer>>,
}

impl MemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut transfers: Vec<Transfer>) -> Vec<Transfer> {
        transfers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        transfers
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, transfer: &Transfer) -> Result<()> {
        let mut map = self.transfers.write();
        if map.contains_key(&transfer.transfer_id) {
            return Err(BorderHopError::ConflictError(format!(
                "transfer {} already exists",
                transfer.transfer_id
            ))
            .into());
        }
        map.insert(transfer.transfer_id.clone(), transfer.clone());
        Ok(())
    }

    async fn find_one(&self, lookup: &TransferLookup) -> Result<Option<Transfer>> {
        let map = self.transfers.read();
        let found = match lookup {
            TransferLookup::ById(id) => map.get(id).cloned(),
            TransferLookup::ByCctpId(_) => map.values().find(|t| lookup.matches(t)).cloned(),
        };
        Ok(found)
    }

    async fn find_one_and_update(
        &self,
        lookup: &TransferLookup,
        patch: &TransferPatch,
    ) -> Result<Option<Transfer>> {
        // read-modify-write under one write guard
        let mut map = self.transfers.write();
        let Some(transfer) = map.values_mut().find(|t| lookup.matches(t)) else {
            return Ok(None);
        };
        transfer.check_transition(patch).map_err(BorderHopError::ConflictError)?;
        transfer.apply(patch, Utc::now());
        Ok(Some(transfer.clone()))
    }

    async fn find_by_address(&self, address: &str) -> Result<Vec<Transfer>> {
        let matching = self
            .transfers
            .read()
            .values()
            .filter(|t| t.sender == address || t.recipient == address)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Transfer>> {
        let all = self.transfers.read().values().cloned().collect();
        let mut newest = Self::newest_first(all);
        newest.truncate(limit);
        Ok(newest)
    }

    async fn stats(&self) -> Result<TransferStats> {
        Ok(TransferStats::from_transfers(self.transfers.read().values()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.transfers.read().len() as u64)
    }
}
