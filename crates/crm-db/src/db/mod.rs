//! Database repositories for the data access layer
//!
//! Deal persistence is reached through the `DealStore` / `DealUnitOfWork`
//! traits so the mutation engine only ever sees an explicit transaction handle.
//
// Unit-of-work traits and the Postgres transaction handle
pub mod transaction;
//
// Postgres deal repository
pub mod deal;
//
// In-memory store for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use deal::DealRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryDealStore;
pub use transaction::{DealStore, DealUnitOfWork, PgUnitOfWork};
