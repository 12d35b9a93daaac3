//! Unit-of-work handles
//!
//! Every batch mutation runs against one explicitly passed unit of work. The
//! Postgres implementation wraps a sqlx transaction: begun when the request
//! starts its batch, committed once at the end, rolled back on any failure or
//! when dropped uncommitted.

use async_trait::async_trait;
use crm_core::models::{Address, Deal};
use crm_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};

/// Write-side operations a deal batch needs, all inside one transaction.
#[async_trait]
pub trait DealUnitOfWork: Send {
    async fn insert_deal(&mut self, deal: &Deal) -> Result<(), AppError>;

    /// Load a deal and lock its row until the unit of work ends.
    async fn find_deal_for_update(&mut self, id: &str) -> Result<Option<Deal>, AppError>;

    async fn update_deal(&mut self, deal: &Deal) -> Result<(), AppError>;

    async fn insert_addresses(&mut self, addresses: &[Address]) -> Result<(), AppError>;

    async fn delete_addresses(&mut self, deal_id: &str) -> Result<u64, AppError>;

    /// Bulk delete; ids that do not exist are ignored. Returns the ids removed.
    async fn delete_deals(&mut self, ids: &[String]) -> Result<Vec<String>, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Entry point to deal persistence: opens units of work and serves reads.
#[async_trait]
pub trait DealStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn DealUnitOfWork>, AppError>;

    async fn get_deal(&self, id: &str) -> Result<Option<Deal>, AppError>;

    async fn list_deals(&self, limit: i64, offset: i64) -> Result<Vec<Deal>, AppError>;

    async fn list_addresses(&self, deal_id: &str) -> Result<Vec<Address>, AppError>;

    /// Cheap connectivity check for health endpoints
    async fn ping(&self) -> Result<(), AppError>;
}

/// Map a statement or commit failure inside a unit of work. The database's own
/// message (e.g. the violated constraint) is kept as the cause.
pub(crate) fn transaction_error(err: sqlx::Error) -> AppError {
    match err.as_database_error() {
        Some(db_err) => AppError::Transaction(db_err.message().to_string()),
        None => AppError::Transaction(err.to_string()),
    }
}

/// A Postgres transaction that rolls back unless explicitly committed.
pub struct PgUnitOfWork {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await.map_err(AppError::Database)?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// The live transaction. Fails if the unit of work already ended.
    pub(crate) fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, AppError> {
        self.transaction.as_mut().ok_or_else(|| {
            AppError::Internal("Transaction was already committed or rolled back".to_string())
        })
    }

    pub async fn commit_inner(&mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await.map_err(transaction_error)?;
        }
        Ok(())
    }

    pub async fn rollback_inner(&mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await.map_err(transaction_error)?;
        }
        Ok(())
    }
}

impl Drop for PgUnitOfWork {
    fn drop(&mut self) {
        // sqlx rolls the transaction back when it is dropped
        if self.transaction.is_some() {
            tracing::warn!("Unit of work dropped without commit - rolling back");
        }
    }
}
