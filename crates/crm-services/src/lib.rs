//! CRM Services Layer
//!
//! Hosts the record mutation engine (batches of create/update/delete
//! operations applied atomically through one unit of work per batch) and the
//! inbound mail ingest. Keep business rules here and thin GraphQL/HTTP
//! handling in crm-api.

pub mod mail;
pub mod mutations;

pub use mail::MailIngest;
pub use mutations::DealMutations;
