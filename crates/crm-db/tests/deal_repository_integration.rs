use chrono::Utc;
use crm_core::models::{Currency, Deal, DealState, DealType, NewAddress};
use crm_core::AppError;
use crm_db::{DealRepository, DealStore, MIGRATOR};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

async fn setup_test_db() -> (ContainerAsync<Postgres>, DealRepository) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    MIGRATOR.run(&pool).await.expect("Migrations failed");

    (postgres, DealRepository::new(pool))
}

fn deal(id: &str) -> Deal {
    let now = Utc::now();
    Deal {
        id: id.to_string(),
        name: format!("Deal {}", id),
        description: Some("rack space".to_string()),
        amount: Some(Decimal::new(250000, 2)),
        currency: Currency::Eur,
        deal_type: DealType::Hoster,
        deal_state: DealState::New,
        is_paid: false,
        closed_at: None,
        company_id: None,
        contact_id: None,
        referral_code: None,
        created_at: now,
        updated_at: now,
    }
}

fn address(city: &str) -> NewAddress {
    NewAddress {
        city: Some(city.to_string()),
        country: Some("NL".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_insert_and_get_deal() {
    let (_container, repo) = setup_test_db().await;

    let mut uow = repo.begin().await.unwrap();
    uow.insert_deal(&deal("d1")).await.unwrap();
    uow.insert_addresses(&[address("Utrecht").into_address("a1".to_string(), "d1")])
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let stored = repo.get_deal("d1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Deal d1");
    assert_eq!(stored.currency, Currency::Eur);
    assert_eq!(stored.amount, Some(Decimal::new(250000, 2)));
    assert_eq!(stored.deal_state, DealState::New);

    let addresses = repo.list_addresses("d1").await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].city.as_deref(), Some("Utrecht"));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_rollback_discards_inserts() {
    let (_container, repo) = setup_test_db().await;

    let mut uow = repo.begin().await.unwrap();
    uow.insert_deal(&deal("d1")).await.unwrap();
    uow.rollback().await.unwrap();

    assert!(repo.get_deal("d1").await.unwrap().is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_dropped_unit_of_work_rolls_back() {
    let (_container, repo) = setup_test_db().await;

    {
        let mut uow = repo.begin().await.unwrap();
        uow.insert_deal(&deal("d1")).await.unwrap();
    }

    assert!(repo.get_deal("d1").await.unwrap().is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_unknown_company_is_a_transaction_error() {
    let (_container, repo) = setup_test_db().await;

    let mut d = deal("d1");
    d.company_id = Some("no-such-company".to_string());

    let mut uow = repo.begin().await.unwrap();
    let err = uow.insert_deal(&d).await.unwrap_err();
    uow.rollback().await.unwrap();

    match err {
        AppError::Transaction(message) => assert!(message.contains("foreign key")),
        other => panic!("expected transaction error, got {:?}", other),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_update_and_replace_addresses() {
    let (_container, repo) = setup_test_db().await;

    let mut uow = repo.begin().await.unwrap();
    uow.insert_deal(&deal("d1")).await.unwrap();
    uow.insert_addresses(&[
        address("Utrecht").into_address("a1".to_string(), "d1"),
        address("Delft").into_address("a2".to_string(), "d1"),
    ])
    .await
    .unwrap();
    uow.commit().await.unwrap();

    let mut uow = repo.begin().await.unwrap();
    let mut locked = uow.find_deal_for_update("d1").await.unwrap().unwrap();
    locked.deal_state = DealState::Closed;
    locked.is_paid = true;
    uow.update_deal(&locked).await.unwrap();
    let removed = uow.delete_addresses("d1").await.unwrap();
    uow.insert_addresses(&[address("Leiden").into_address("a3".to_string(), "d1")])
        .await
        .unwrap();
    uow.commit().await.unwrap();

    assert_eq!(removed, 2);
    let stored = repo.get_deal("d1").await.unwrap().unwrap();
    assert_eq!(stored.deal_state, DealState::Closed);
    assert!(stored.is_paid);
    let addresses = repo.list_addresses("d1").await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].id, "a3");
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_delete_returns_removed_ids_and_cascades() {
    let (_container, repo) = setup_test_db().await;

    let mut uow = repo.begin().await.unwrap();
    uow.insert_deal(&deal("d1")).await.unwrap();
    uow.insert_deal(&deal("d2")).await.unwrap();
    uow.insert_addresses(&[address("Utrecht").into_address("a1".to_string(), "d1")])
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = repo.begin().await.unwrap();
    let deleted = uow
        .delete_deals(&["d1".to_string(), "ghost".to_string()])
        .await
        .unwrap();
    uow.commit().await.unwrap();

    assert_eq!(deleted, vec!["d1".to_string()]);
    assert!(repo.get_deal("d1").await.unwrap().is_none());
    assert!(repo.list_addresses("d1").await.unwrap().is_empty());
    assert_eq!(repo.list_deals(10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_addresses_come_back_in_submission_order() {
    let (_container, repo) = setup_test_db().await;

    let mut uow = repo.begin().await.unwrap();
    uow.insert_deal(&deal("d1")).await.unwrap();
    uow.insert_addresses(&[
        address("Utrecht").into_address("z".to_string(), "d1"),
        address("Delft").into_address("m".to_string(), "d1"),
        address("Leiden").into_address("b".to_string(), "d1"),
        address("Gouda").into_address("a".to_string(), "d1"),
    ])
    .await
    .unwrap();
    uow.commit().await.unwrap();

    let cities: Vec<String> = repo
        .list_addresses("d1")
        .await
        .unwrap()
        .into_iter()
        .filter_map(|a| a.city)
        .collect();
    assert_eq!(cities, vec!["Utrecht", "Delft", "Leiden", "Gouda"]);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_amount_keeps_submitted_scale() {
    let (_container, repo) = setup_test_db().await;

    let mut d = deal("d1");
    d.amount = Some(Decimal::new(1005, 3));
    let mut uow = repo.begin().await.unwrap();
    uow.insert_deal(&d).await.unwrap();
    uow.commit().await.unwrap();

    let stored = repo.get_deal("d1").await.unwrap().unwrap();
    assert_eq!(stored.amount, Some(Decimal::new(1005, 3)));
}
