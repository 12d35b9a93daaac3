//! GraphQL schema
//!
//! The roots are assembled from a fixed list of per-entity objects. Adding an
//! entity means adding its query and mutation objects to `QueryRoot` and
//! `MutationRoot`.

pub mod deal;

use async_graphql::{EmptySubscription, ErrorExtensions, MergedObject, Schema};
use crm_core::{AppError, ErrorMetadata};
use crm_db::DealStore;
use crm_services::DealMutations;
use std::sync::Arc;

use crate::error::log_error;

pub use deal::{DealMutation, DealQuery};

#[derive(MergedObject, Default)]
pub struct QueryRoot(DealQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(DealMutation);

pub type CrmSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(store: Arc<dyn DealStore>) -> CrmSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    )
    .data(DealMutations::new(store.clone()))
    .data(store)
    .finish()
}

/// Convert an application error into a GraphQL error carrying its code.
pub(crate) fn gql_error(err: AppError) -> async_graphql::Error {
    log_error(&err);
    let code = err.error_code();
    async_graphql::Error::new(err.client_message()).extend_with(|_, ext| ext.set("code", code))
}
