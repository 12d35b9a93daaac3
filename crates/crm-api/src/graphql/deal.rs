use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use crm_core::models::{
    parse_closed_at, Address, BatchOutcome, Currency, Deal, DealPatch, DealState, DealType,
    FieldUpdate, NewAddress, NewDeal,
};
use crm_core::AppError;
use crm_db::DealStore;
use crm_services::DealMutations;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::gql_error;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// A deal as exposed over GraphQL; `uid` is the stored id.
pub struct DealObject(Deal);

#[Object(name = "Deal")]
impl DealObject {
    async fn uid(&self) -> &str {
        &self.0.id
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    async fn amount(&self) -> Option<Decimal> {
        self.0.amount
    }

    async fn currency(&self) -> Currency {
        self.0.currency
    }

    async fn deal_type(&self) -> DealType {
        self.0.deal_type
    }

    async fn deal_state(&self) -> DealState {
        self.0.deal_state
    }

    async fn is_paid(&self) -> bool {
        self.0.is_paid
    }

    async fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.0.closed_at
    }

    async fn company_id(&self) -> Option<&str> {
        self.0.company_id.as_deref()
    }

    async fn contact_id(&self) -> Option<&str> {
        self.0.contact_id.as_deref()
    }

    async fn referral_code(&self) -> Option<&str> {
        self.0.referral_code.as_deref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }

    async fn shipping_addresses(&self, ctx: &Context<'_>) -> Result<Vec<AddressObject>> {
        let store = ctx.data::<Arc<dyn DealStore>>()?;
        let addresses = store.list_addresses(&self.0.id).await.map_err(gql_error)?;
        Ok(addresses.into_iter().map(AddressObject::from).collect())
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Address")]
pub struct AddressObject {
    uid: String,
    street_number: Option<String>,
    street_name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
}

impl From<Address> for AddressObject {
    fn from(address: Address) -> Self {
        Self {
            uid: address.id,
            street_number: address.street_number,
            street_name: address.street_name,
            city: address.city,
            state: address.state,
            zip_code: address.zip_code,
            country: address.country,
        }
    }
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct AddressArguments {
    street_number: Option<String>,
    street_name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
}

impl From<AddressArguments> for NewAddress {
    fn from(args: AddressArguments) -> Self {
        NewAddress {
            street_number: args.street_number,
            street_name: args.street_name,
            city: args.city,
            state: args.state,
            zip_code: args.zip_code,
            country: args.country,
        }
    }
}

/// One record of a `createDeals` batch. Enum-valued fields are accepted as
/// strings in any case.
#[derive(InputObject, Debug, Clone)]
pub struct CreateDealArguments {
    name: String,
    description: Option<String>,
    amount: Option<Decimal>,
    currency: String,
    deal_type: String,
    closed_at: Option<String>,
    company_id: Option<String>,
    contact_id: Option<String>,
    referral_code: Option<String>,
    shipping_addresses: Option<Vec<AddressArguments>>,
}

impl TryFrom<CreateDealArguments> for NewDeal {
    type Error = AppError;

    fn try_from(args: CreateDealArguments) -> Result<Self, Self::Error> {
        Ok(NewDeal {
            name: args.name,
            description: args.description,
            amount: args.amount,
            currency: args.currency.parse()?,
            deal_type: args.deal_type.parse()?,
            closed_at: args.closed_at.as_deref().map(parse_closed_at).transpose()?,
            company_id: args.company_id,
            contact_id: args.contact_id,
            referral_code: args.referral_code,
            shipping_addresses: args
                .shipping_addresses
                .unwrap_or_default()
                .into_iter()
                .map(NewAddress::from)
                .collect(),
        })
    }
}

/// One record of an `updateDeals` batch. Omitted fields keep their stored
/// value; nullable fields passed as `null` are cleared.
#[derive(InputObject, Debug, Clone)]
pub struct UpdateDealArguments {
    uid: String,
    name: Option<String>,
    description: MaybeUndefined<String>,
    amount: MaybeUndefined<Decimal>,
    currency: Option<String>,
    deal_type: Option<String>,
    deal_state: Option<String>,
    is_paid: Option<bool>,
    closed_at: MaybeUndefined<String>,
    company_id: MaybeUndefined<String>,
    contact_id: MaybeUndefined<String>,
    referral_code: MaybeUndefined<String>,
    shipping_addresses: Option<Vec<AddressArguments>>,
}

fn field_update<T>(value: MaybeUndefined<T>) -> FieldUpdate<T> {
    match value {
        MaybeUndefined::Undefined => FieldUpdate::Unchanged,
        MaybeUndefined::Null => FieldUpdate::Clear,
        MaybeUndefined::Value(v) => FieldUpdate::Set(v),
    }
}

impl TryFrom<UpdateDealArguments> for DealPatch {
    type Error = AppError;

    fn try_from(args: UpdateDealArguments) -> Result<Self, Self::Error> {
        let closed_at = match field_update(args.closed_at) {
            FieldUpdate::Set(raw) => FieldUpdate::Set(parse_closed_at(&raw)?),
            FieldUpdate::Clear => FieldUpdate::Clear,
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
        };

        Ok(DealPatch {
            id: args.uid,
            name: args.name,
            description: field_update(args.description),
            amount: field_update(args.amount),
            currency: args.currency.as_deref().map(str::parse).transpose()?,
            deal_type: args.deal_type.as_deref().map(str::parse).transpose()?,
            deal_state: args.deal_state.as_deref().map(str::parse).transpose()?,
            is_paid: args.is_paid,
            closed_at,
            company_id: field_update(args.company_id),
            contact_id: field_update(args.contact_id),
            referral_code: field_update(args.referral_code),
            shipping_addresses: args
                .shipping_addresses
                .map(|list| list.into_iter().map(NewAddress::from).collect()),
        })
    }
}

/// Payload of every batch mutation
#[derive(SimpleObject, Debug, Clone)]
pub struct MutationResult {
    ok: bool,
    ids: Vec<String>,
}

impl From<BatchOutcome> for MutationResult {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            ok: outcome.ok,
            ids: outcome.ids,
        }
    }
}

#[derive(Default)]
pub struct DealQuery;

#[Object]
impl DealQuery {
    /// Look up one deal by its uid
    async fn deal(&self, ctx: &Context<'_>, uid: String) -> Result<Option<DealObject>> {
        let store = ctx.data::<Arc<dyn DealStore>>()?;
        let deal = store.get_deal(&uid).await.map_err(gql_error)?;
        Ok(deal.map(DealObject))
    }

    /// Deals ordered by creation time
    async fn deals(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 50)] limit: i64,
        #[graphql(default = 0)] offset: i64,
    ) -> Result<Vec<DealObject>> {
        let store = ctx.data::<Arc<dyn DealStore>>()?;
        let limit = if limit <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            limit.min(MAX_PAGE_SIZE)
        };
        let deals = store
            .list_deals(limit, offset.max(0))
            .await
            .map_err(gql_error)?;
        Ok(deals.into_iter().map(DealObject).collect())
    }
}

#[derive(Default)]
pub struct DealMutation;

#[Object]
impl DealMutation {
    async fn create_deals(
        &self,
        ctx: &Context<'_>,
        records: Vec<CreateDealArguments>,
    ) -> Result<MutationResult> {
        let mutations = ctx.data::<DealMutations>()?;
        let records = records
            .into_iter()
            .map(NewDeal::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(gql_error)?;
        let outcome = mutations.create_deals(records).await.map_err(gql_error)?;
        Ok(outcome.into())
    }

    async fn update_deals(
        &self,
        ctx: &Context<'_>,
        records: Vec<UpdateDealArguments>,
    ) -> Result<MutationResult> {
        let mutations = ctx.data::<DealMutations>()?;
        let records = records
            .into_iter()
            .map(DealPatch::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(gql_error)?;
        let outcome = mutations.update_deals(records).await.map_err(gql_error)?;
        Ok(outcome.into())
    }

    /// Unknown uids are ignored; `ids` lists the deals actually removed.
    async fn delete_deals(&self, ctx: &Context<'_>, uids: Vec<String>) -> Result<MutationResult> {
        let mutations = ctx.data::<DealMutations>()?;
        let outcome = mutations.delete_deals(uids).await.map_err(gql_error)?;
        Ok(outcome.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_args(uid: &str) -> UpdateDealArguments {
        UpdateDealArguments {
            uid: uid.to_string(),
            name: None,
            description: MaybeUndefined::Undefined,
            amount: MaybeUndefined::Undefined,
            currency: None,
            deal_type: None,
            deal_state: None,
            is_paid: None,
            closed_at: MaybeUndefined::Undefined,
            company_id: MaybeUndefined::Undefined,
            contact_id: MaybeUndefined::Undefined,
            referral_code: MaybeUndefined::Undefined,
            shipping_addresses: None,
        }
    }

    #[test]
    fn test_create_arguments_parse_enums_case_insensitively() {
        let args = CreateDealArguments {
            name: "Hosting".to_string(),
            description: None,
            amount: Some(Decimal::new(1000, 0)),
            currency: "eur".to_string(),
            deal_type: "Hoster".to_string(),
            closed_at: Some("2024-06-01".to_string()),
            company_id: None,
            contact_id: None,
            referral_code: None,
            shipping_addresses: Some(vec![AddressArguments {
                city: Some("Cairo".to_string()),
                ..Default::default()
            }]),
        };

        let new_deal = NewDeal::try_from(args).unwrap();
        assert_eq!(new_deal.currency, Currency::Eur);
        assert_eq!(new_deal.deal_type, DealType::Hoster);
        assert!(new_deal.closed_at.is_some());
        assert_eq!(new_deal.shipping_addresses.len(), 1);
        assert_eq!(new_deal.shipping_addresses[0].city.as_deref(), Some("Cairo"));
    }

    #[test]
    fn test_create_arguments_reject_unknown_currency() {
        let args = CreateDealArguments {
            name: "Hosting".to_string(),
            description: None,
            amount: None,
            currency: "YEN".to_string(),
            deal_type: "HOSTER".to_string(),
            closed_at: None,
            company_id: None,
            contact_id: None,
            referral_code: None,
            shipping_addresses: None,
        };
        assert!(matches!(
            NewDeal::try_from(args),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_arguments_distinguish_null_from_omitted() {
        let mut args = update_args("d1");
        args.description = MaybeUndefined::Null;
        args.referral_code = MaybeUndefined::Value("SPRING".to_string());
        args.deal_state = Some("closed".to_string());
        args.shipping_addresses = Some(vec![]);

        let patch = DealPatch::try_from(args).unwrap();
        assert_eq!(patch.id, "d1");
        assert_eq!(patch.description, FieldUpdate::Clear);
        assert_eq!(patch.amount, FieldUpdate::Unchanged);
        assert_eq!(patch.referral_code, FieldUpdate::Set("SPRING".to_string()));
        assert_eq!(patch.deal_state, Some(DealState::Closed));
        assert_eq!(patch.shipping_addresses, Some(vec![]));
    }

    #[test]
    fn test_update_arguments_reject_bad_closed_at() {
        let mut args = update_args("d1");
        args.closed_at = MaybeUndefined::Value("soon".to_string());
        assert!(DealPatch::try_from(args).is_err());
    }
}
