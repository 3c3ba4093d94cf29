use std::time::Duration;

use feira_common::Money;
use feira_engine::{
    config::PollPolicy,
    db_types::{OrderId, OrderStatusType, PayoutStatus},
    gateway_types::PaymentStatus,
    settlement::{SettlementApi, SettlementError},
    test_utils::{
        mock_gateway::MockGateway,
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_product, seed_suspended_user, seed_user},
    },
    SettlementDatabase,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

async fn setup() -> SettlementApi<SqliteDatabase, MockGateway> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let gateway = MockGateway::new();
    SettlementApi::new(db, gateway)
}

async fn tear_down(api: SettlementApi<SqliteDatabase, MockGateway>) {
    let mut db = api.db().clone();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(db.url()).await.unwrap();
}

fn gateway_of(api: &SettlementApi<SqliteDatabase, MockGateway>) -> MockGateway {
    api.gateway().clone()
}

#[test]
fn completed_payment_settles_the_order() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let buyer = seed_user(api.db().pool(), "ana").await;
        let seller = seed_user(api.db().pool(), "bruno").await;
        let product = seed_product(api.db().pool(), &seller, "Caneca artesanal", Money::from_reais(45), 3).await;

        let checkout = api.initiate(buyer.id, product.id).await.expect("Error starting checkout");
        assert_eq!(checkout.intent.amount, product.price);
        assert!(!checkout.intent.copy_paste_code.is_empty());

        gateway.set_status(&checkout.intent.id, PaymentStatus::Completed);
        let order = api
            .confirm(&checkout.intent.id, buyer.id, product.id, Some("Rua A, 123".to_string()))
            .await
            .expect("Error confirming payment");
        assert_eq!(order.order_id, OrderId::from(checkout.intent.id.as_str()));
        assert_eq!(order.status, OrderStatusType::Paid);
        assert_eq!(order.price, product.price);
        assert_eq!(order.seller_id, seller.id);
        assert_eq!(order.shipping_address.as_deref(), Some("Rua A, 123"));

        let stored = api.db().fetch_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 2);

        let payout = api.db().fetch_payout(&order.order_id).await.unwrap().expect("No payout ledger entry");
        assert_eq!(payout.status, PayoutStatus::Sent);
        assert_eq!(payout.amount, product.price);
        assert_eq!(payout.seller_id, seller.id);
        assert_eq!(payout.attempts, 1);
        assert_eq!(gateway.withdrawals().len(), 1);
        tear_down(api).await;
    });
}

#[test]
fn uncaptured_payments_settle_nothing() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let buyer = seed_user(api.db().pool(), "carla").await;
        let seller = seed_user(api.db().pool(), "davi").await;
        let product = seed_product(api.db().pool(), &seller, "Quadro pintado", Money::from_reais(200), 1).await;
        let checkout = api.initiate(buyer.id, product.id).await.unwrap();

        for status in [PaymentStatus::Pending, PaymentStatus::Active, PaymentStatus::Expired] {
            gateway.set_status(&checkout.intent.id, status.clone());
            let err = api.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap_err();
            assert!(matches!(err, SettlementError::NotYetPaid(_, s) if s == status));
        }
        let order_id = OrderId::from(checkout.intent.id.as_str());
        assert!(api.db().fetch_order_by_order_id(&order_id).await.unwrap().is_none());
        let stored = api.db().fetch_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 1);
        assert!(api.db().fetch_payout(&order_id).await.unwrap().is_none());
        tear_down(api).await;
    });
}

#[test]
fn confirming_twice_settles_once() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let buyer = seed_user(api.db().pool(), "elisa").await;
        let seller = seed_user(api.db().pool(), "fábio").await;
        let product = seed_product(api.db().pool(), &seller, "Bolsa de couro", Money::from_reais(320), 5).await;
        let checkout = api.initiate(buyer.id, product.id).await.unwrap();
        gateway.set_status(&checkout.intent.id, PaymentStatus::Completed);

        let first = api.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();
        let second = api.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.order_id, second.order_id);

        let stored = api.db().fetch_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 4);
        assert_eq!(gateway.withdrawals().len(), 1);
        let payout = api.db().fetch_payout(&first.order_id).await.unwrap().unwrap();
        assert_eq!(payout.attempts, 1);
        tear_down(api).await;
    });
}

#[test]
fn stock_drains_to_sold_out() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let seller = seed_user(api.db().pool(), "gilda").await;
        let product = seed_product(api.db().pool(), &seller, "Vaso de cerâmica", Money::from_reais(80), 2).await;

        let mut settled = 0;
        for handle in ["hugo", "iara"] {
            let buyer = seed_user(api.db().pool(), handle).await;
            let checkout = api.initiate(buyer.id, product.id).await.unwrap();
            gateway.set_status(&checkout.intent.id, PaymentStatus::Completed);
            api.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();
            settled += 1;
        }
        assert_eq!(settled, 2);

        // The third buyer is turned away at checkout
        let late_buyer = seed_user(api.db().pool(), "jonas").await;
        let err = api.initiate(late_buyer.id, product.id).await.unwrap_err();
        assert!(matches!(err, SettlementError::SoldOut(id) if id == product.id));
        let stored = api.db().fetch_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 0);
        tear_down(api).await;
    });
}

#[test]
fn paid_but_sold_out_settles_nothing_and_requires_a_refund() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let seller = seed_user(api.db().pool(), "karen").await;
        let product = seed_product(api.db().pool(), &seller, "Colar de contas", Money::from_reais(60), 1).await;
        let first_buyer = seed_user(api.db().pool(), "lucas").await;
        let second_buyer = seed_user(api.db().pool(), "marta").await;

        // Both buyers check out while stock is visible to each
        let first = api.initiate(first_buyer.id, product.id).await.unwrap();
        let second = api.initiate(second_buyer.id, product.id).await.unwrap();
        gateway.set_status(&first.intent.id, PaymentStatus::Completed);
        gateway.set_status(&second.intent.id, PaymentStatus::Completed);

        api.confirm(&first.intent.id, first_buyer.id, product.id, None).await.unwrap();
        let err = api.confirm(&second.intent.id, second_buyer.id, product.id, None).await.unwrap_err();
        assert!(matches!(err, SettlementError::SoldOut(id) if id == product.id));

        // The losing payment left no order and no payout behind
        let order_id = OrderId::from(second.intent.id.as_str());
        assert!(api.db().fetch_order_by_order_id(&order_id).await.unwrap().is_none());
        assert!(api.db().fetch_payout(&order_id).await.unwrap().is_none());
        assert_eq!(gateway.withdrawals().len(), 1);
        tear_down(api).await;
    });
}

#[test]
fn failed_payouts_stay_pending_and_can_be_retried() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let buyer = seed_user(api.db().pool(), "nina").await;
        let seller = seed_user(api.db().pool(), "otto").await;
        let product = seed_product(api.db().pool(), &seller, "Tapete de retalhos", Money::from_reais(150), 2).await;
        let checkout = api.initiate(buyer.id, product.id).await.unwrap();
        gateway.set_status(&checkout.intent.id, PaymentStatus::Completed);
        gateway.fail_withdrawals(true);

        // The settlement stands even though the withdrawal failed
        let order = api.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();
        let payout = api.db().fetch_payout(&order.order_id).await.unwrap().unwrap();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert_eq!(payout.attempts, 1);
        assert!(gateway.withdrawals().is_empty());

        gateway.fail_withdrawals(false);
        let sent = api.retry_pending_payouts().await.expect("Error retrying payouts");
        assert_eq!(sent, vec![order.order_id.clone()]);
        let payout = api.db().fetch_payout(&order.order_id).await.unwrap().unwrap();
        assert_eq!(payout.status, PayoutStatus::Sent);
        assert_eq!(payout.attempts, 2);
        assert_eq!(gateway.withdrawals().len(), 1);

        // Nothing pending any more
        assert!(api.retry_pending_payouts().await.unwrap().is_empty());
        tear_down(api).await;
    });
}

#[test]
fn confirm_with_retry_polls_until_capture() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let buyer = seed_user(api.db().pool(), "paula").await;
        let seller = seed_user(api.db().pool(), "rui").await;
        let product = seed_product(api.db().pool(), &seller, "Licor de jabuticaba", Money::from_reais(35), 4).await;
        let checkout = api.initiate(buyer.id, product.id).await.unwrap();
        gateway.set_statuses(&checkout.intent.id, [
            PaymentStatus::Pending,
            PaymentStatus::Active,
            PaymentStatus::Completed,
        ]);

        let policy = PollPolicy {
            max_attempts: 5,
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
        };
        let order = api
            .confirm_with_retry(&checkout.intent.id, buyer.id, product.id, None, policy)
            .await
            .expect("Error confirming with retry");
        assert_eq!(order.status, OrderStatusType::Paid);
        tear_down(api).await;
    });
}

#[test]
fn confirm_with_retry_gives_up_after_max_attempts() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let gateway = gateway_of(&api);
        let buyer = seed_user(api.db().pool(), "sofia").await;
        let seller = seed_user(api.db().pool(), "tiago").await;
        let product = seed_product(api.db().pool(), &seller, "Cinto trançado", Money::from_reais(70), 1).await;
        let checkout = api.initiate(buyer.id, product.id).await.unwrap();
        gateway.set_status(&checkout.intent.id, PaymentStatus::Pending);

        let policy = PollPolicy {
            max_attempts: 3,
            initial_interval: Duration::from_millis(2),
            max_interval: Duration::from_millis(4),
        };
        let err = api.confirm_with_retry(&checkout.intent.id, buyer.id, product.id, None, policy).await.unwrap_err();
        assert!(matches!(err, SettlementError::NotYetPaid(_, PaymentStatus::Pending)));
        tear_down(api).await;
    });
}

#[test]
fn suspended_buyers_cannot_check_out() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let api = setup().await;
        let buyer = seed_suspended_user(api.db().pool(), "ze-bloqueado").await;
        let seller = seed_user(api.db().pool(), "vera").await;
        let product = seed_product(api.db().pool(), &seller, "Sandália de couro", Money::from_reais(90), 2).await;
        let err = api.initiate(buyer.id, product.id).await.unwrap_err();
        assert!(matches!(err, SettlementError::SuspendedUser(id) if id == buyer.id));
        tear_down(api).await;
    });
}
