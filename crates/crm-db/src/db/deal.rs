use async_trait::async_trait;
use crm_core::models::{Address, Deal, DealRow};
use crm_core::AppError;
use sqlx::{PgPool, Postgres};

use super::transaction::{transaction_error, DealStore, DealUnitOfWork, PgUnitOfWork};

const DEAL_COLUMNS: &str = "id, name, description, amount, currency, deal_type, deal_state, \
     is_paid, closed_at, company_id, contact_id, referral_code, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
    "id, deal_id, street_number, street_name, city, state, zip_code, country";

/// Repository for deals and their shipping addresses
#[derive(Clone)]
pub struct DealRepository {
    pool: PgPool,
}

impl DealRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DealStore for DealRepository {
    async fn begin(&self) -> Result<Box<dyn DealUnitOfWork>, AppError> {
        Ok(Box::new(PgUnitOfWork::begin(&self.pool).await?))
    }

    #[tracing::instrument(skip(self), fields(db.table = "deals", db.operation = "select", db.record_id = %id))]
    async fn get_deal(&self, id: &str) -> Result<Option<Deal>, AppError> {
        let row = sqlx::query_as::<Postgres, DealRow>(&format!(
            "SELECT {} FROM deals WHERE id = $1",
            DEAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Deal::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "deals", db.operation = "select"))]
    async fn list_deals(&self, limit: i64, offset: i64) -> Result<Vec<Deal>, AppError> {
        let rows = sqlx::query_as::<Postgres, DealRow>(&format!(
            "SELECT {} FROM deals ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2",
            DEAL_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Deal::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "addresses", db.operation = "select"))]
    async fn list_addresses(&self, deal_id: &str) -> Result<Vec<Address>, AppError> {
        let addresses = sqlx::query_as::<Postgres, Address>(&format!(
            "SELECT {} FROM addresses WHERE deal_id = $1 ORDER BY seq",
            ADDRESS_COLUMNS
        ))
        .bind(deal_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DealUnitOfWork for PgUnitOfWork {
    #[tracing::instrument(skip(self, deal), fields(db.table = "deals", db.operation = "insert", db.record_id = %deal.id))]
    async fn insert_deal(&mut self, deal: &Deal) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO deals (
                id, name, description, amount, currency, deal_type, deal_state,
                is_paid, closed_at, company_id, contact_id, referral_code,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&deal.id)
        .bind(&deal.name)
        .bind(&deal.description)
        .bind(deal.amount)
        .bind(deal.currency.as_str())
        .bind(deal.deal_type.as_str())
        .bind(deal.deal_state.as_str())
        .bind(deal.is_paid)
        .bind(deal.closed_at)
        .bind(&deal.company_id)
        .bind(&deal.contact_id)
        .bind(&deal.referral_code)
        .bind(deal.created_at)
        .bind(deal.updated_at)
        .execute(&mut **self.tx()?)
        .await
        .map_err(transaction_error)?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "deals", db.operation = "select", db.record_id = %id))]
    async fn find_deal_for_update(&mut self, id: &str) -> Result<Option<Deal>, AppError> {
        let row = sqlx::query_as::<Postgres, DealRow>(&format!(
            "SELECT {} FROM deals WHERE id = $1 FOR UPDATE",
            DEAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **self.tx()?)
        .await
        .map_err(transaction_error)?;

        row.map(Deal::try_from).transpose()
    }

    #[tracing::instrument(skip(self, deal), fields(db.table = "deals", db.operation = "update", db.record_id = %deal.id))]
    async fn update_deal(&mut self, deal: &Deal) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE deals SET
                name = $2, description = $3, amount = $4, currency = $5,
                deal_type = $6, deal_state = $7, is_paid = $8, closed_at = $9,
                company_id = $10, contact_id = $11, referral_code = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(&deal.id)
        .bind(&deal.name)
        .bind(&deal.description)
        .bind(deal.amount)
        .bind(deal.currency.as_str())
        .bind(deal.deal_type.as_str())
        .bind(deal.deal_state.as_str())
        .bind(deal.is_paid)
        .bind(deal.closed_at)
        .bind(&deal.company_id)
        .bind(&deal.contact_id)
        .bind(&deal.referral_code)
        .bind(deal.updated_at)
        .execute(&mut **self.tx()?)
        .await
        .map_err(transaction_error)?;

        Ok(())
    }

    #[tracing::instrument(skip(self, addresses), fields(db.table = "addresses", db.operation = "insert", count = addresses.len()))]
    async fn insert_addresses(&mut self, addresses: &[Address]) -> Result<(), AppError> {
        for address in addresses {
            sqlx::query(
                r#"
                INSERT INTO addresses (
                    id, deal_id, street_number, street_name, city, state, zip_code, country
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&address.id)
            .bind(&address.deal_id)
            .bind(&address.street_number)
            .bind(&address.street_name)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip_code)
            .bind(&address.country)
            .execute(&mut **self.tx()?)
            .await
            .map_err(transaction_error)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "addresses", db.operation = "delete"))]
    async fn delete_addresses(&mut self, deal_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM addresses WHERE deal_id = $1")
            .bind(deal_id)
            .execute(&mut **self.tx()?)
            .await
            .map_err(transaction_error)?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "deals", db.operation = "delete", count = ids.len()))]
    async fn delete_deals(&mut self, ids: &[String]) -> Result<Vec<String>, AppError> {
        // Addresses are removed by ON DELETE CASCADE
        let deleted = sqlx::query_scalar::<Postgres, String>(
            "DELETE FROM deals WHERE id = ANY($1) RETURNING id",
        )
        .bind(ids)
        .fetch_all(&mut **self.tx()?)
        .await
        .map_err(transaction_error)?;
        Ok(deleted)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), AppError> {
        self.commit_inner().await
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), AppError> {
        self.rollback_inner().await
    }
}
