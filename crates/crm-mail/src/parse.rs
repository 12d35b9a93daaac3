//! Inbound MIME parsing
//!
//! A multipart message is walked depth-first (the root container itself is
//! skipped). `text/plain` parts are concatenated into the body; any other part
//! whose `Content-Disposition` carries a `filename` becomes an [`Attachment`]
//! named after the BLAKE2b-512 digest of its decoded bytes. Everything else is
//! dropped.
//!
//! Parsing never touches the filesystem. Writing the attachments to their
//! computed paths is up to the caller (see `crm-storage`).

use blake2::{Blake2b512, Digest};
use crm_core::models::{Attachment, AttachmentLocation};
use crm_core::AppError;
use mailparse::{MailParseError, ParsedMail};
use std::path::Path;

/// Plain-text body and attachments extracted from one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEmail {
    pub body: String,
    /// In the order the parts appear in the message
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone)]
pub struct MailParser {
    location: AttachmentLocation,
}

fn malformed(err: MailParseError) -> AppError {
    AppError::InvalidInput(format!("Malformed MIME message: {}", err))
}

/// Hex digest of `bytes` followed by the extension of `original_filename`
pub fn hashed_filename(bytes: &[u8], original_filename: &str) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());

    match Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("{}.{}", digest, ext),
        None => digest,
    }
}

impl MailParser {
    pub fn new(location: AttachmentLocation) -> Self {
        Self { location }
    }

    /// Split a raw message into its text body and attachments.
    #[tracing::instrument(skip(self, raw), fields(size_bytes = raw.len()))]
    pub fn parse_email_body(&self, raw: &str) -> Result<ParsedEmail, AppError> {
        let message = mailparse::parse_mail(raw.as_bytes()).map_err(malformed)?;

        // A multipart header without a usable boundary leaves no subparts.
        if !is_multipart(&message) || message.subparts.is_empty() {
            return Ok(ParsedEmail {
                body: message.get_body().map_err(malformed)?,
                attachments: Vec::new(),
            });
        }

        let mut parsed = ParsedEmail::default();
        for part in &message.subparts {
            self.walk(part, &mut parsed)?;
        }

        tracing::debug!(
            attachments = parsed.attachments.len(),
            body_len = parsed.body.len(),
            "Parsed inbound message"
        );
        Ok(parsed)
    }

    fn walk(&self, part: &ParsedMail<'_>, parsed: &mut ParsedEmail) -> Result<(), AppError> {
        let content_type = part.ctype.mimetype.to_ascii_lowercase();

        if content_type == "text/plain" {
            parsed.body.push_str(&part.get_body().map_err(malformed)?);
        } else if let Some(filename) = part.get_content_disposition().params.get("filename") {
            parsed
                .attachments
                .push(self.attachment(part, filename, content_type.clone())?);
        }

        for child in &part.subparts {
            self.walk(child, parsed)?;
        }
        Ok(())
    }

    fn attachment(
        &self,
        part: &ParsedMail<'_>,
        filename: &str,
        content_type: String,
    ) -> Result<Attachment, AppError> {
        let binary_content = part.get_body_raw().map_err(malformed)?;
        let hashed = hashed_filename(&binary_content, filename);

        Ok(Attachment {
            hashed_filepath: self.location.file_path(&hashed),
            hashed_file_url: self.location.file_url(&hashed),
            hashed_filename: hashed,
            original_filename: filename.to_string(),
            binary_content,
            content_type,
        })
    }
}

fn is_multipart(message: &ParsedMail<'_>) -> bool {
    message
        .ctype
        .mimetype
        .to_ascii_lowercase()
        .starts_with("multipart/")
}
