//! Transfer record and the small vocabulary around it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sender recorded when the client does not supply one.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Lifecycle of a remittance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Processing => "processing",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TransferStatus::Pending),
            "processing" => Some(TransferStatus::Processing),
            "completed" => Some(TransferStatus::Completed),
            "failed" => Some(TransferStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    /// Terminal records never move to a different status.
    pub fn can_transition_to(&self, next: &TransferStatus) -> bool {
        self == next || !self.is_terminal()
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the sender wants the route optimised for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransferIntent {
    #[default]
    Standard,
    MaximizeYield,
    MinimizeFees,
}

impl TransferIntent {
    pub const ALL: [TransferIntent; 3] =
        [TransferIntent::Standard, TransferIntent::MaximizeYield, TransferIntent::MinimizeFees];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferIntent::Standard => "standard",
            TransferIntent::MaximizeYield => "maximize_yield",
            TransferIntent::MinimizeFees => "minimize_fees",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == s.trim())
    }
}

impl fmt::Display for TransferIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted remittance record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub transfer_id: String,
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub source_chain: String,
    pub destination_chain: String,
    pub intent: TransferIntent,
    pub status: TransferStatus,
    pub estimated_fees: f64,
    pub suggested_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cctp_transfer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    /// Fresh pending record stamped with `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transfer_id: String,
        sender: String,
        recipient: String,
        amount: f64,
        source_chain: String,
        destination_chain: String,
        intent: TransferIntent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            transfer_id,
            sender,
            recipient,
            amount,
            source_chain,
            destination_chain,
            intent,
            status: TransferStatus::Pending,
            estimated_fees: 0.001,
            suggested_actions: Vec::new(),
            tx_hash: None,
            destination_tx_hash: None,
            cctp_transfer_id: None,
            error: None,
            email: None,
            note: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set every field the patch provides and bump `updated_at`.
    pub fn apply(&mut self, patch: &TransferPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(hash) = &patch.tx_hash {
            self.tx_hash = Some(hash.clone());
        }
        if let Some(hash) = &patch.destination_tx_hash {
            self.destination_tx_hash = Some(hash.clone());
        }
        if let Some(id) = &patch.cctp_transfer_id {
            self.cctp_transfer_id = Some(id.clone());
        }
        if let Some(err) = &patch.error {
            self.error = Some(err.clone());
        }
        if let Some(at) = patch.completed_at {
            self.completed_at = Some(at);
        }
        self.updated_at = now;
    }

    /// Whether the patch would move this record to a status it refuses.
    pub fn check_transition(&self, patch: &TransferPatch) -> Result<(), String> {
        match patch.status {
            Some(next) if !self.status.can_transition_to(&next) => Err(format!(
                "transfer {} is {} and cannot become {}",
                self.transfer_id, self.status, next
            )),
            _ => Ok(()),
        }
    }

    pub fn hooks_executed(&self) -> bool {
        self.status == TransferStatus::Completed
    }
}

/// Partial update applied to a stored transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferPatch {
    pub status: Option<TransferStatus>,
    pub tx_hash: Option<String>,
    pub destination_tx_hash: Option<String>,
    pub cctp_transfer_id: Option<String>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransferPatch {
    pub fn is_empty(&self) -> bool {
        *self == TransferPatch::default()
    }
}

/// Key a stored transfer is looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferLookup {
    ById(String),
    ByCctpId(String),
}

impl TransferLookup {
    pub fn matches(&self, transfer: &Transfer) -> bool {
        match self {
            TransferLookup::ById(id) => &transfer.transfer_id == id,
            TransferLookup::ByCctpId(id) => transfer.cctp_transfer_id.as_deref() == Some(id.as_str()),
        }
    }
}

impl fmt::Display for TransferLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferLookup::ById(id) => write!(f, "transferId={}", id),
            TransferLookup::ByCctpId(id) => write!(f, "cctpTransferId={}", id),
        }
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char).collect()
}

/// `{prefix}_{unix millis}_{9 base36 chars}`. Unique enough for a demo, not more.
pub fn generate_transfer_id(prefix: &str) -> String {
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), random_base36(9))
}

pub fn generate_cctp_id() -> String {
    format!("cctp_{}", random_base36(9))
}

/// Random 32-byte hash in `0x` hex form.
pub fn generate_tx_hash() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    format!("0x{}", hex::encode(bytes))
}
