use serde::{Deserialize, Serialize};
use validator::Validate;

/// Shipping address owned by a single deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: String,
    pub deal_id: String,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Address fields supplied inside a deal create/update record
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct NewAddress {
    #[validate(length(max = 64))]
    pub street_number: Option<String>,
    #[validate(length(max = 255))]
    pub street_name: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 255))]
    pub state: Option<String>,
    #[validate(length(max = 32))]
    pub zip_code: Option<String>,
    #[validate(length(max = 255))]
    pub country: Option<String>,
}

impl NewAddress {
    /// Materialize the address as owned by `deal_id`.
    pub fn into_address(self, id: String, deal_id: &str) -> Address {
        Address {
            id,
            deal_id: deal_id.to_string(),
            street_number: self.street_number,
            street_name: self.street_name,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
        }
    }
}
