//! SQLite storage for partners and balance history.

use async_trait::async_trait;
use balance_core::BalanceSample;
use balance_engine::{window_start, BalanceStore, StoreError};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Partner {partner} not found in network {network}")]
    PartnerNotFound { partner: String, network: String },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::PartnerNotFound { partner, network } => {
                StoreError::PartnerNotFound { partner, network }
            }
            DbError::Sqlx(e) => StoreError::Database(e.to_string()),
        }
    }
}

/// Database connection for balance history.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the SQLite database at the given URL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every pooled connection to `:memory:` would open its own database.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS partners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                network TEXT NOT NULL,
                partner TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                UNIQUE(network, partner)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS balances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                partner_id INTEGER NOT NULL REFERENCES partners(id),
                created_at INTEGER NOT NULL,
                balance REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_balances_partner_time
            ON balances(partner_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn partner_id(&self, partner: &str, network: &str) -> Result<i64, DbError> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM partners WHERE network = ? AND partner = ?",
        )
        .bind(network)
        .bind(partner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id,)| id).ok_or_else(|| DbError::PartnerNotFound {
            partner: partner.to_string(),
            network: network.to_string(),
        })
    }

    /// Insert a partner or update its active flag.
    pub async fn upsert_partner(
        &self,
        partner: &str,
        network: &str,
        is_active: bool,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO partners (network, partner, is_active)
            VALUES (?, ?, ?)
            ON CONFLICT(network, partner) DO UPDATE SET is_active = excluded.is_active
            "#,
        )
        .bind(network)
        .bind(partner)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Active flag of a registered partner.
    pub async fn is_partner_active(&self, partner: &str, network: &str) -> Result<bool, DbError> {
        let (is_active,) = sqlx::query_as::<_, (bool,)>(
            "SELECT is_active FROM partners WHERE network = ? AND partner = ?",
        )
        .bind(network)
        .bind(partner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::PartnerNotFound {
            partner: partner.to_string(),
            network: network.to_string(),
        })?;
        Ok(is_active)
    }

    pub async fn insert_balance(&self, sample: &BalanceSample) -> Result<(), DbError> {
        let partner_id = self.partner_id(&sample.partner, &sample.network).await?;
        sqlx::query("INSERT INTO balances (partner_id, created_at, balance) VALUES (?, ?, ?)")
            .bind(partner_id)
            .bind(sample.recorded_at.timestamp_millis())
            .bind(sample.amount)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Balances recorded at or after `since`, oldest first.
    pub async fn balances_since(
        &self,
        partner: &str,
        network: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<f64>, DbError> {
        let partner_id = self.partner_id(partner, network).await?;
        let rows = sqlx::query_as::<_, (f64,)>(
            r#"
            SELECT balance FROM balances
            WHERE partner_id = ? AND created_at >= ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(partner_id)
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(balance,)| balance).collect())
    }

    /// Delete balances of a network recorded before `cutoff`.
    pub async fn delete_balances_before(
        &self,
        network: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            DELETE FROM balances
            WHERE created_at < ?
            AND partner_id IN (SELECT id FROM partners WHERE network = ?)
            "#,
        )
        .bind(cutoff.timestamp_millis())
        .bind(network)
        .execute(&self.pool)
        .await?;

        debug!(network, deleted = result.rows_affected(), "Deleted old balances");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BalanceStore for Database {
    async fn upsert_partner(
        &self,
        partner: &str,
        network: &str,
        is_active: bool,
    ) -> Result<(), StoreError> {
        Ok(Database::upsert_partner(self, partner, network, is_active).await?)
    }

    async fn append_balance(&self, sample: &BalanceSample) -> Result<(), StoreError> {
        Ok(self.insert_balance(sample).await?)
    }

    async fn read_recent_balances(
        &self,
        partner: &str,
        network: &str,
        lookback_days: u32,
    ) -> Result<Vec<f64>, StoreError> {
        let since = window_start(Utc::now(), lookback_days);
        Ok(self.balances_since(partner, network, since).await?)
    }

    async fn purge_older_than(&self, network: &str, retention_days: u32) -> Result<u64, StoreError> {
        let cutoff = window_start(Utc::now(), retention_days);
        Ok(self.delete_balances_before(network, cutoff).await?)
    }
}
