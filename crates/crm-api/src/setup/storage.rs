//! Static directory and attachment store setup

use anyhow::{Context, Result};
use crm_core::Config;
use crm_storage::{AttachmentStore, LocalAttachmentStore};
use std::sync::Arc;

/// Create the static and attachment directories and open the attachment store.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn AttachmentStore>> {
    tokio::fs::create_dir_all(&config.static_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create static directory {}",
                config.static_dir.display()
            )
        })?;

    let store = LocalAttachmentStore::new(&config.attachments_dir).await?;
    tracing::info!(
        static_dir = %config.static_dir.display(),
        attachments_dir = %store.base_path().display(),
        "Attachment storage initialized"
    );

    Ok(Arc::new(store))
}
