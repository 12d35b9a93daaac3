//! Service wiring

use anyhow::Result;
use crm_core::models::AttachmentLocation;
use crm_core::Config;
use crm_db::DealStore;
use crm_mail::MailParser;
use crm_services::MailIngest;
use std::sync::Arc;

use crate::graphql::build_schema;
use crate::state::{AppState, DbState, GraphqlState, MailState};

/// Build the application state around `store`.
pub async fn initialize_services(
    config: &Config,
    store: Arc<dyn DealStore>,
) -> Result<Arc<AppState>> {
    let attachments = super::storage::setup_storage(config).await?;

    let location = AttachmentLocation::new(
        config.attachments_dir.clone(),
        config.static_url_path.clone(),
    );
    let ingest = MailIngest::new(MailParser::new(location), attachments.clone());

    let schema = build_schema(store.clone());
    tracing::info!("GraphQL schema built");

    Ok(Arc::new(AppState {
        db: DbState { store },
        graphql: GraphqlState { schema },
        mail: MailState {
            ingest,
            attachments,
        },
    }))
}
