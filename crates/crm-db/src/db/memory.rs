//! In-memory `DealStore` for tests
//!
//! Each unit of work edits a private copy of the data and publishes it on
//! commit, so uncommitted work is never visible. Foreign keys on
//! `company_id`/`contact_id` are checked at commit.

use async_trait::async_trait;
use crm_core::models::{Address, Deal};
use crm_core::AppError;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::transaction::{DealStore, DealUnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    deals: BTreeMap<String, Deal>,
    addresses: Vec<Address>,
    companies: HashSet<String>,
    contacts: HashSet<String>,
}

impl MemoryState {
    fn check_references(&self) -> Result<(), AppError> {
        for deal in self.deals.values() {
            if let Some(company_id) = &deal.company_id {
                if !self.companies.contains(company_id) {
                    return Err(AppError::Transaction(format!(
                        "insert or update on table \"deals\" violates foreign key constraint \"deals_company_id_fkey\": Key (company_id)=({}) is not present in table \"companies\"",
                        company_id
                    )));
                }
            }
            if let Some(contact_id) = &deal.contact_id {
                if !self.contacts.contains(contact_id) {
                    return Err(AppError::Transaction(format!(
                        "insert or update on table \"deals\" violates foreign key constraint \"deals_contact_id_fkey\": Key (contact_id)=({}) is not present in table \"contacts\"",
                        contact_id
                    )));
                }
            }
        }
        Ok(())
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deal store backed by process memory
#[derive(Clone, Default)]
pub struct InMemoryDealStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDealStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&self, id: &str) {
        lock(&self.state).companies.insert(id.to_string());
    }

    pub fn add_contact(&self, id: &str) {
        lock(&self.state).contacts.insert(id.to_string());
    }

    /// Seed a deal directly, bypassing units of work
    pub fn insert_deal(&self, deal: Deal) {
        lock(&self.state).deals.insert(deal.id.clone(), deal);
    }

    pub fn deal_count(&self) -> usize {
        lock(&self.state).deals.len()
    }

    pub fn address_count(&self) -> usize {
        lock(&self.state).addresses.len()
    }
}

#[async_trait]
impl DealStore for InMemoryDealStore {
    async fn begin(&self) -> Result<Box<dyn DealUnitOfWork>, AppError> {
        let working = lock(&self.state).clone();
        Ok(Box::new(InMemoryUnitOfWork {
            shared: self.state.clone(),
            working,
        }))
    }

    async fn get_deal(&self, id: &str) -> Result<Option<Deal>, AppError> {
        Ok(lock(&self.state).deals.get(id).cloned())
    }

    async fn list_deals(&self, limit: i64, offset: i64) -> Result<Vec<Deal>, AppError> {
        let state = lock(&self.state);
        let mut deals: Vec<Deal> = state.deals.values().cloned().collect();
        deals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(deals
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_addresses(&self, deal_id: &str) -> Result<Vec<Address>, AppError> {
        let state = lock(&self.state);
        // Insertion order
        Ok(state
            .addresses
            .iter()
            .filter(|a| a.deal_id == deal_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

struct InMemoryUnitOfWork {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
}

#[async_trait]
impl DealUnitOfWork for InMemoryUnitOfWork {
    async fn insert_deal(&mut self, deal: &Deal) -> Result<(), AppError> {
        if self.working.deals.contains_key(&deal.id) {
            return Err(AppError::Transaction(format!(
                "duplicate key value violates unique constraint \"deals_pkey\": Key (id)=({}) already exists",
                deal.id
            )));
        }
        self.working.deals.insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn find_deal_for_update(&mut self, id: &str) -> Result<Option<Deal>, AppError> {
        Ok(self.working.deals.get(id).cloned())
    }

    async fn update_deal(&mut self, deal: &Deal) -> Result<(), AppError> {
        if let Some(existing) = self.working.deals.get_mut(&deal.id) {
            *existing = deal.clone();
        }
        Ok(())
    }

    async fn insert_addresses(&mut self, addresses: &[Address]) -> Result<(), AppError> {
        for address in addresses {
            if !self.working.deals.contains_key(&address.deal_id) {
                return Err(AppError::Transaction(format!(
                    "insert or update on table \"addresses\" violates foreign key constraint \"addresses_deal_id_fkey\": Key (deal_id)=({}) is not present in table \"deals\"",
                    address.deal_id
                )));
            }
            self.working.addresses.push(address.clone());
        }
        Ok(())
    }

    async fn delete_addresses(&mut self, deal_id: &str) -> Result<u64, AppError> {
        let before = self.working.addresses.len();
        self.working.addresses.retain(|a| a.deal_id != deal_id);
        Ok((before - self.working.addresses.len()) as u64)
    }

    async fn delete_deals(&mut self, ids: &[String]) -> Result<Vec<String>, AppError> {
        let mut deleted = Vec::new();
        for id in ids {
            if self.working.deals.remove(id).is_some() {
                deleted.push(id.clone());
            }
        }
        // cascade
        self.working
            .addresses
            .retain(|a| !deleted.contains(&a.deal_id));
        Ok(deleted)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.working.check_references()?;
        *lock(&self.shared) = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}
