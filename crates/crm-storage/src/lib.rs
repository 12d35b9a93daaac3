//! CRM attachment storage
//!
//! Inbound mail attachments are stored under a content-addressed name (hash of
//! the bytes plus the original extension) in a single flat directory. Files are
//! written once and never modified afterwards.
//!
//! Keys are bare file names: no directory separators, no `..`.

pub mod local;
pub mod traits;

pub use local::LocalAttachmentStore;
pub use traits::{AttachmentStore, StorageError, StorageResult};
