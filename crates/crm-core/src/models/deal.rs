use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::address::NewAddress;
use crate::AppError;

/// Declares a closed set of upper-case string values stored as TEXT columns.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::InvalidInput(format!(
                        "Invalid {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(
    /// Currency a deal amount is expressed in
    Currency {
        Usd => "USD",
        Eur => "EUR",
        Aed => "AED",
        Gbp => "GBP",
    }
);

text_enum!(
    DealType {
        Hoster => "HOSTER",
        Ito => "ITO",
        Pto => "PTO",
        Ambassador => "AMBASSADOR",
    }
);

text_enum!(
    /// Lifecycle state of a deal. New deals always start in `New`.
    #[derive(Default)]
    DealState {
        #[default]
        New => "NEW",
        Interested => "INTERESTED",
        Confirmed => "CONFIRMED",
        Pending => "PENDING",
        Closed => "CLOSED",
    }
);

/// A persisted deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Currency,
    pub deal_type: DealType,
    pub deal_state: DealState,
    pub is_paid: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub company_id: Option<String>,
    pub contact_id: Option<String>,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `deals` row; enum columns are TEXT and converted in `TryFrom`.
#[cfg(feature = "sqlx")]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DealRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: String,
    pub deal_type: String,
    pub deal_state: String,
    pub is_paid: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub company_id: Option<String>,
    pub contact_id: Option<String>,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl TryFrom<DealRow> for Deal {
    type Error = AppError;

    fn try_from(row: DealRow) -> Result<Self, Self::Error> {
        Ok(Deal {
            currency: row.currency.parse()?,
            deal_type: row.deal_type.parse()?,
            deal_state: row.deal_state.parse()?,
            id: row.id,
            name: row.name,
            description: row.description,
            amount: row.amount,
            is_paid: row.is_paid,
            closed_at: row.closed_at,
            company_id: row.company_id,
            contact_id: row.contact_id,
            referral_code: row.referral_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const NAME_RULE: &str = "Deal name must be between 1 and 255 characters";

/// Deal names are counted in characters and may not be blank.
fn validate_deal_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if name.trim().is_empty() || len > 255 {
        return Err(ValidationError::new("length").with_message(NAME_RULE.into()));
    }
    Ok(())
}

/// Fields accepted when creating a deal
#[derive(Debug, Clone, Validate)]
pub struct NewDeal {
    #[validate(custom(function = "validate_deal_name"))]
    pub name: String,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Currency,
    pub deal_type: DealType,
    pub closed_at: Option<DateTime<Utc>>,
    pub company_id: Option<String>,
    pub contact_id: Option<String>,
    #[validate(length(max = 255))]
    pub referral_code: Option<String>,
    pub shipping_addresses: Vec<NewAddress>,
}

impl NewDeal {
    /// Build the deal row. The lifecycle state is always reset to `NEW`.
    pub fn into_deal(self, id: String, now: DateTime<Utc>) -> (Deal, Vec<NewAddress>) {
        let deal = Deal {
            id,
            name: self.name,
            description: self.description,
            amount: self.amount,
            currency: self.currency,
            deal_type: self.deal_type,
            deal_state: DealState::New,
            is_paid: false,
            closed_at: self.closed_at,
            company_id: self.company_id,
            contact_id: self.contact_id,
            referral_code: self.referral_code,
            created_at: now,
            updated_at: now,
        };
        (deal, self.shipping_addresses)
    }
}

/// Change to a nullable column
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldUpdate<T> {
    /// Field not supplied; keep the stored value
    #[default]
    Unchanged,
    /// Field supplied as null
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    fn apply_to(self, slot: &mut Option<T>) {
        match self {
            FieldUpdate::Unchanged => {}
            FieldUpdate::Clear => *slot = None,
            FieldUpdate::Set(value) => *slot = Some(value),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FieldUpdate<U> {
        match self {
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
            FieldUpdate::Clear => FieldUpdate::Clear,
            FieldUpdate::Set(value) => FieldUpdate::Set(f(value)),
        }
    }
}

/// Overwrite set for one deal in an update batch.
///
/// Only the fields listed here can be written; anything else in a request is
/// rejected before it reaches the engine.
#[derive(Debug, Clone, Default)]
pub struct DealPatch {
    pub id: String,
    pub name: Option<String>,
    pub description: FieldUpdate<String>,
    pub amount: FieldUpdate<Decimal>,
    pub currency: Option<Currency>,
    pub deal_type: Option<DealType>,
    pub deal_state: Option<DealState>,
    pub is_paid: Option<bool>,
    pub closed_at: FieldUpdate<DateTime<Utc>>,
    pub company_id: FieldUpdate<String>,
    pub contact_id: FieldUpdate<String>,
    pub referral_code: FieldUpdate<String>,
    /// A non-empty list replaces the whole address set. `None` or an empty
    /// list keeps the current one.
    pub shipping_addresses: Option<Vec<NewAddress>>,
}

impl DealPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_deal_name(name)
                .map_err(|_| AppError::InvalidInput(NAME_RULE.to_string()))?;
        }
        for address in self.shipping_addresses.iter().flatten() {
            address.validate()?;
        }
        Ok(())
    }

    /// Apply every supplied field to `deal` (last write wins) and return the
    /// replacement address set, if any.
    pub fn apply(self, deal: &mut Deal, now: DateTime<Utc>) -> Option<Vec<NewAddress>> {
        if let Some(name) = self.name {
            deal.name = name;
        }
        if let Some(currency) = self.currency {
            deal.currency = currency;
        }
        if let Some(deal_type) = self.deal_type {
            deal.deal_type = deal_type;
        }
        if let Some(deal_state) = self.deal_state {
            deal.deal_state = deal_state;
        }
        if let Some(is_paid) = self.is_paid {
            deal.is_paid = is_paid;
        }
        self.description.apply_to(&mut deal.description);
        self.amount.apply_to(&mut deal.amount);
        self.closed_at.apply_to(&mut deal.closed_at);
        self.company_id.apply_to(&mut deal.company_id);
        self.contact_id.apply_to(&mut deal.contact_id);
        self.referral_code.apply_to(&mut deal.referral_code);
        deal.updated_at = now;
        self.shipping_addresses.filter(|addresses| !addresses.is_empty())
    }
}

/// Parse a `closed_at` argument: either `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_closed_at(value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "closed_at must be YYYY-MM-DD or an RFC 3339 timestamp, got '{}'",
                value
            ))
        })
}
