//! Application state and sub-state extractors.
//!
//! Handlers extract only the part they need through axum's `FromRef`.

use axum::extract::FromRef;
use crm_db::DealStore;
use crm_services::MailIngest;
use crm_storage::AttachmentStore;
use std::sync::Arc;

use crate::graphql::CrmSchema;

/// Record store shared by the schema and the health check
#[derive(Clone)]
pub struct DbState {
    pub store: Arc<dyn DealStore>,
}

#[derive(Clone)]
pub struct GraphqlState {
    pub schema: CrmSchema,
}

/// Inbound mail pipeline and the attachment store behind it
#[derive(Clone)]
pub struct MailState {
    pub ingest: MailIngest,
    pub attachments: Arc<dyn AttachmentStore>,
}

pub struct AppState {
    pub db: DbState,
    pub graphql: GraphqlState,
    pub mail: MailState,
}

impl FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl FromRef<Arc<AppState>> for GraphqlState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.graphql.clone()
    }
}

impl FromRef<Arc<AppState>> for MailState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.mail.clone()
    }
}
