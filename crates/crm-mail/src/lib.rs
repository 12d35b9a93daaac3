//! CRM mail pipeline
//!
//! - `parse`: split an inbound MIME message into its plain-text body and
//!   content-addressed attachments.
//! - `send`: render a Markdown body and dispatch it through a `MailTransport`
//!   (SendGrid v3 in production).

pub mod markdown;
pub mod parse;
pub mod send;

pub use parse::{MailParser, ParsedEmail};
pub use send::{
    MailMessage, MailTransport, Mailer, OutgoingEmail, SendGridTransport, TransportResponse,
};
