use crm_core::AppError;
use crm_mail::{MailParser, ParsedEmail};
use crm_storage::AttachmentStore;
use std::sync::Arc;

/// Parses inbound messages and stores their attachments under the
/// content-addressed paths the parser computed.
#[derive(Clone)]
pub struct MailIngest {
    parser: MailParser,
    attachments: Arc<dyn AttachmentStore>,
}

impl MailIngest {
    pub fn new(parser: MailParser, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self {
            parser,
            attachments,
        }
    }

    /// Parse `raw` and persist every attachment. Attachments whose content is
    /// already stored are left as they are.
    #[tracing::instrument(skip(self, raw), fields(size_bytes = raw.len()))]
    pub async fn ingest(&self, raw: &str) -> Result<ParsedEmail, AppError> {
        let parsed = self.parser.parse_email_body(raw)?;

        let mut written = 0usize;
        for attachment in &parsed.attachments {
            if self.attachments.persist(attachment).await? {
                written += 1;
            }
        }

        tracing::info!(
            attachments = parsed.attachments.len(),
            written,
            "Inbound message ingested"
        );
        Ok(parsed)
    }
}
