use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{TransferStats, TransferStore};
use crate::core::{BorderHopError, Transfer, TransferIntent, TransferLookup, TransferPatch, TransferStatus};

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Transfer records in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteTransferStore {
    pool: SqlitePool,
    is_memory: bool,
}

/// Accept `sqlite:` and `sqlite://` forms and make sure a file database has a directory.
fn normalize_url(database_url: &str) -> Result<String> {
    let mut db_url = database_url.trim().to_string();
    if !db_url.starts_with("sqlite:") {
        bail!("Unsupported database URL scheme, expected sqlite:");
    }
    if !db_url.starts_with("sqlite://") {
        db_url = db_url.replacen("sqlite:", "sqlite://", 1);
    }

    if let Some(path) = db_url.strip_prefix("sqlite://") {
        let path_only = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
        if path_only != ":memory:" && !path_only.is_empty() {
            if let Some(parent) = std::path::Path::new(path_only).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        warn!("Failed to create database dir {:?}: {}", parent, e);
                    }
                }
            }
        }
    }
    Ok(db_url)
}

impl SqliteTransferStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let db_url = normalize_url(database_url)?;
        let is_memory = db_url.contains(":memory:");

        // the URL may carry credentials in query params; log only its shape
        let safe_db_url_info = match db_url.split_once("://") {
            Some((scheme, rest)) => format!("{}://(redacted, len={})", scheme, rest.len()),
            None => "(invalid db_url format)".to_string(),
        };
        info!(db = %safe_db_url_info, "[storage] connecting to database");

        let mut connect_options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| anyhow!("Invalid database URL: {}", e))?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT)
            .synchronous(SqliteSynchronous::Normal);
        if !is_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // an in-memory database lives exactly as long as its one connection
        let pool_options = if is_memory {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(connect_options)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        let store = Self { pool, is_memory };
        store.initialize_schema().await?;

        info!("Transfer storage initialized");
        Ok(store)
    }

    pub fn is_in_memory(&self) -> bool {
        self.is_memory
    }

    async fn initialize_schema(&self) -> Result<()> {
        debug!("Initializing transfer schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transfers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transfer_id TEXT UNIQUE NOT NULL,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                amount REAL NOT NULL,
                source_chain TEXT NOT NULL,
                destination_chain TEXT NOT NULL,
                intent TEXT NOT NULL,
                status TEXT NOT NULL,
                estimated_fees REAL NOT NULL,
                suggested_actions TEXT NOT NULL,
                tx_hash TEXT,
                destination_tx_hash TEXT,
                cctp_transfer_id TEXT,
                error TEXT,
                email TEXT,
                note TEXT,
                completed_at DATETIME,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to create transfers table: {}", e))?;

        for ddl in [
            "CREATE INDEX IF NOT EXISTS idx_transfers_sender ON transfers(sender, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_recipient ON transfers(recipient, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_status ON transfers(status)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_created ON transfers(created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_cctp ON transfers(cctp_transfer_id)",
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| anyhow!("Failed to create transfers index: {}", e))?;
        }

        Ok(())
    }

    fn lookup_clause(lookup: &TransferLookup) -> (&'static str, &str) {
        match lookup {
            TransferLookup::ById(id) => ("transfer_id", id.as_str()),
            TransferLookup::ByCctpId(id) => ("cctp_transfer_id", id.as_str()),
        }
    }
}

fn row_to_transfer(row: &SqliteRow) -> Result<Transfer> {
    let intent_str: String = row.try_get("intent")?;
    let status_str: String = row.try_get("status")?;
    let actions_json: String = row.try_get("suggested_actions")?;

    Ok(Transfer {
        transfer_id: row.try_get("transfer_id")?,
        sender: row.try_get("sender")?,
        recipient: row.try_get("recipient")?,
        amount: row.try_get("amount")?,
        source_chain: row.try_get("source_chain")?,
        destination_chain: row.try_get("destination_chain")?,
        intent: TransferIntent::parse(&intent_str)
            .ok_or_else(|| anyhow!("Unknown intent in database: {}", intent_str))?,
        status: TransferStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("Unknown status in database: {}", status_str))?,
        estimated_fees: row.try_get("estimated_fees")?,
        suggested_actions: serde_json::from_str(&actions_json)?,
        tx_hash: row.try_get("tx_hash")?,
        destination_tx_hash: row.try_get("destination_tx_hash")?,
        cctp_transfer_id: row.try_get("cctp_transfer_id")?,
        error: row.try_get("error")?,
        email: row.try_get("email")?,
        note: row.try_get("note")?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TransferStore for SqliteTransferStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, transfer: &Transfer) -> Result<()> {
        let actions = serde_json::to_string(&transfer.suggested_actions)?;
        let result = sqlx::query(
            r#"
            INSERT INTO transfers (
                transfer_id, sender, recipient, amount, source_chain, destination_chain,
                intent, status, estimated_fees, suggested_actions, tx_hash, destination_tx_hash,
                cctp_transfer_id, error, email, note, completed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
        )
        .bind(&transfer.transfer_id)
        .bind(&transfer.sender)
        .bind(&transfer.recipient)
        .bind(transfer.amount)
        .bind(&transfer.source_chain)
        .bind(&transfer.destination_chain)
        .bind(transfer.intent.as_str())
        .bind(transfer.status.as_str())
        .bind(transfer.estimated_fees)
        .bind(actions)
        .bind(&transfer.tx_hash)
        .bind(&transfer.destination_tx_hash)
        .bind(&transfer.cctp_transfer_id)
        .bind(&transfer.error)
        .bind(&transfer.email)
        .bind(&transfer.note)
        .bind(transfer.completed_at)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(transfer_id = %transfer.transfer_id, "Stored transfer");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                BorderHopError::ConflictError(format!("transfer {} already exists", transfer.transfer_id))
                    .into(),
            ),
            Err(e) => Err(anyhow!("Failed to store transfer: {}", e)),
        }
    }

    async fn find_one(&self, lookup: &TransferLookup) -> Result<Option<Transfer>> {
        let (column, value) = Self::lookup_clause(lookup);
        let sql = format!("SELECT * FROM transfers WHERE {} = ?1 LIMIT 1", column);
        let row = sqlx::query(&sql).bind(value).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn find_one_and_update(
        &self,
        lookup: &TransferLookup,
        patch: &TransferPatch,
    ) -> Result<Option<Transfer>> {
        let (column, value) = Self::lookup_clause(lookup);
        let select = format!("SELECT * FROM transfers WHERE {} = ?1 LIMIT 1", column);

        // take the write lock before reading so concurrent updates queue on busy_timeout
        // instead of failing when a deferred read snapshot is upgraded
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let row = sqlx::query(&select).bind(value).fetch_optional(&mut *tx).await?;
        let mut transfer = match row {
            Some(row) => row_to_transfer(&row)?,
            None => return Ok(None),
        };

        transfer.check_transition(patch).map_err(BorderHopError::ConflictError)?;
        transfer.apply(patch, Utc::now());

        sqlx::query(
            r#"
            UPDATE transfers
            SET status = ?1, tx_hash = ?2, destination_tx_hash = ?3, cctp_transfer_id = ?4,
                error = ?5, completed_at = ?6, updated_at = ?7
            WHERE transfer_id = ?8
            "#,
        )
        .bind(transfer.status.as_str())
        .bind(&transfer.tx_hash)
        .bind(&transfer.destination_tx_hash)
        .bind(&transfer.cctp_transfer_id)
        .bind(&transfer.error)
        .bind(transfer.completed_at)
        .bind(transfer.updated_at)
        .bind(&transfer.transfer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(transfer))
    }

    async fn find_by_address(&self, address: &str) -> Result<Vec<Transfer>> {
        let rows = sqlx::query(
            "SELECT * FROM transfers WHERE sender = ?1 OR recipient = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transfer).collect()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Transfer>> {
        let rows = sqlx::query("SELECT * FROM transfers ORDER BY created_at DESC, id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_transfer).collect()
    }

    async fn stats(&self) -> Result<TransferStats> {
        let totals = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(amount), 0.0) AS volume, \
             COALESCE(SUM(estimated_fees), 0.0) AS fees FROM transfers",
        )
        .fetch_one(&self.pool)
        .await?;

        let mut stats = TransferStats {
            total_transfers: totals.try_get::<i64, _>("total")? as u64,
            total_volume: totals.try_get("volume")?,
            total_fees: totals.try_get("fees")?,
            ..Default::default()
        };

        let chains = sqlx::query(
            "SELECT destination_chain AS key, COUNT(*) AS n FROM transfers GROUP BY destination_chain",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in chains {
            stats.by_destination_chain.insert(row.try_get("key")?, row.try_get::<i64, _>("n")? as u64);
        }

        let intents = sqlx::query("SELECT intent AS key, COUNT(*) AS n FROM transfers GROUP BY intent")
            .fetch_all(&self.pool)
            .await?;
        for row in intents {
            stats.by_intent.insert(row.try_get("key")?, row.try_get::<i64, _>("n")? as u64);
        }

        Ok(stats)
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfers").fetch_one(&self.pool).await?;
        Ok(n as u64)
    }
}
