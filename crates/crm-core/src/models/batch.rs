use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a record operation batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchKind::Create => "create",
            BatchKind::Update => "update",
            BatchKind::Delete => "delete",
        })
    }
}

/// Result of a committed batch. Failed batches surface as an error instead,
/// so `ok` is only ever false when nothing was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub ok: bool,
    /// Entity references in input order (create/update) or the rows removed (delete)
    pub ids: Vec<String>,
}

impl BatchOutcome {
    pub fn committed(ids: Vec<String>) -> Self {
        Self { ok: true, ids }
    }
}

/// Generate a new opaque entity reference.
pub fn new_entity_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
