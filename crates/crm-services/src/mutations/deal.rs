use chrono::{DateTime, Utc};
use crm_core::models::{
    new_entity_id, Address, BatchKind, BatchOutcome, DealPatch, NewAddress, NewDeal,
};
use crm_core::AppError;
use crm_db::{DealStore, DealUnitOfWork};
use std::sync::Arc;
use validator::Validate;

use super::finish_batch;

/// Applies deal batches. Each call is one transaction: every record is staged
/// through the same unit of work and the batch commits once at the end.
#[derive(Clone)]
pub struct DealMutations {
    store: Arc<dyn DealStore>,
}

fn owned_addresses(addresses: Vec<NewAddress>, deal_id: &str) -> Vec<Address> {
    addresses
        .into_iter()
        .map(|address| address.into_address(new_entity_id(), deal_id))
        .collect()
}

impl DealMutations {
    pub fn new(store: Arc<dyn DealStore>) -> Self {
        Self { store }
    }

    /// Create every record, returning the new ids in input order.
    #[tracing::instrument(skip(self, records), fields(batch.kind = "create", batch.size = records.len()))]
    pub async fn create_deals(&self, records: Vec<NewDeal>) -> Result<BatchOutcome, AppError> {
        for record in &records {
            record.validate()?;
            for address in &record.shipping_addresses {
                address.validate()?;
            }
        }
        if records.is_empty() {
            return Ok(BatchOutcome::committed(Vec::new()));
        }

        let mut uow = self.store.begin().await?;
        let staged = stage_creates(uow.as_mut(), records, Utc::now()).await;
        let ids = finish_batch(uow, BatchKind::Create, staged).await?;

        tracing::info!(count = ids.len(), "Deals created");
        Ok(BatchOutcome::committed(ids))
    }

    /// Overwrite the supplied fields of existing deals. An unknown id aborts
    /// the whole batch with `Invalid id (<id>)`.
    #[tracing::instrument(skip(self, records), fields(batch.kind = "update", batch.size = records.len()))]
    pub async fn update_deals(&self, records: Vec<DealPatch>) -> Result<BatchOutcome, AppError> {
        for record in &records {
            record.validate()?;
        }
        if records.is_empty() {
            return Ok(BatchOutcome::committed(Vec::new()));
        }

        let mut uow = self.store.begin().await?;
        let staged = stage_updates(uow.as_mut(), records, Utc::now()).await;
        let ids = finish_batch(uow, BatchKind::Update, staged).await?;

        tracing::info!(count = ids.len(), "Deals updated");
        Ok(BatchOutcome::committed(ids))
    }

    /// Delete deals by id. Unknown ids are ignored; the outcome lists the ids
    /// that were actually removed.
    #[tracing::instrument(skip(self, ids), fields(batch.kind = "delete", batch.size = ids.len()))]
    pub async fn delete_deals(&self, ids: Vec<String>) -> Result<BatchOutcome, AppError> {
        if ids.is_empty() {
            return Ok(BatchOutcome::committed(Vec::new()));
        }

        let mut uow = self.store.begin().await?;
        let staged = uow.delete_deals(&ids).await;
        let deleted = finish_batch(uow, BatchKind::Delete, staged).await?;

        tracing::info!(
            requested = ids.len(),
            deleted = deleted.len(),
            "Deals deleted"
        );
        Ok(BatchOutcome::committed(deleted))
    }
}

async fn stage_creates(
    uow: &mut dyn DealUnitOfWork,
    records: Vec<NewDeal>,
    now: DateTime<Utc>,
) -> Result<Vec<String>, AppError> {
    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        let (deal, addresses) = record.into_deal(new_entity_id(), now);
        uow.insert_deal(&deal).await?;
        if !addresses.is_empty() {
            uow.insert_addresses(&owned_addresses(addresses, &deal.id))
                .await?;
        }
        ids.push(deal.id);
    }
    Ok(ids)
}

async fn stage_updates(
    uow: &mut dyn DealUnitOfWork,
    records: Vec<DealPatch>,
    now: DateTime<Utc>,
) -> Result<Vec<String>, AppError> {
    let mut ids = Vec::with_capacity(records.len());
    for patch in records {
        let id = patch.id.clone();
        let mut deal = uow
            .find_deal_for_update(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invalid id ({})", id)))?;

        let replacement = patch.apply(&mut deal, now);
        uow.update_deal(&deal).await?;

        if let Some(addresses) = replacement {
            uow.delete_addresses(&id).await?;
            uow.insert_addresses(&owned_addresses(addresses, &id)).await?;
        }
        ids.push(id);
    }
    Ok(ids)
}
