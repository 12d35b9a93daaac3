pub mod address;
pub mod attachment;
pub mod batch;
pub mod deal;

pub use address::{Address, NewAddress};
pub use attachment::{Attachment, AttachmentLocation};
pub use batch::{new_entity_id, BatchKind, BatchOutcome};
#[cfg(feature = "sqlx")]
pub use deal::DealRow;
pub use deal::{
    parse_closed_at, Currency, Deal, DealPatch, DealState, DealType, FieldUpdate, NewDeal,
};
