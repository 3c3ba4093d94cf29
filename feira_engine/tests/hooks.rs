use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use feira_common::Money;
use feira_engine::{
    events::{EventHandlers, EventHooks},
    gateway_types::PaymentStatus,
    settlement::SettlementApi,
    test_utils::{
        mock_gateway::MockGateway,
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_product, seed_user},
    },
    FulfilmentApi,
    SqliteDatabase,
};
use log::*;
use tokio::runtime::Runtime;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[test]
fn order_paid_and_delivered_hooks_fire() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let paid = HookCalled::default();
    let delivered = HookCalled::default();
    let paid_copy = paid.clone();
    let delivered_copy = delivered.clone();
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks
            .on_order_paid(move |ev| {
                info!("🪝️ order paid: {:?}", ev.order.order_id);
                paid_copy.called();
                Box::pin(async {})
            })
            .on_order_delivered(move |ev| {
                info!("🪝️ order delivered: {:?}", ev.order.order_id);
                delivered_copy.called();
                Box::pin(async {})
            });
        let handlers = EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = setup().await;
        let gateway = MockGateway::new();
        let settlement = SettlementApi::new(db.clone(), gateway.clone()).with_producers(producers.clone());
        let fulfilment = FulfilmentApi::new(db.clone()).with_producers(producers);

        let buyer = seed_user(db.pool(), "olga").await;
        let seller = seed_user(db.pool(), "pedro").await;
        let product = seed_product(db.pool(), &seller, "Manteiga de garrafa", Money::from_reais(25), 2).await;
        let checkout = settlement.initiate(buyer.id, product.id).await.unwrap();
        gateway.set_status(&checkout.intent.id, PaymentStatus::Completed);
        let order = settlement.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();
        // Confirming again must not fire the hook a second time
        settlement.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();
        fulfilment.confirm_delivery(&order.order_id, seller.id).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    });
    assert_eq!(paid.count(), 1);
    assert_eq!(delivered.count(), 1);
    info!("🪝️ test complete");
}

#[test]
fn payout_pending_hook_fires_on_failed_withdrawals() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let stuck = HookCalled::default();
    let stuck_copy = stuck.clone();
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_payout_pending(move |ev| {
            info!("🪝️ payout stuck after {} attempt(s): {:?}", ev.attempts, ev.order_id);
            stuck_copy.called();
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = setup().await;
        let gateway = MockGateway::new();
        gateway.fail_withdrawals(true);
        let settlement = SettlementApi::new(db.clone(), gateway.clone()).with_producers(producers);

        let buyer = seed_user(db.pool(), "quita").await;
        let seller = seed_user(db.pool(), "ramon").await;
        let product = seed_product(db.pool(), &seller, "Farinha de mandioca", Money::from_reais(18), 1).await;
        let checkout = settlement.initiate(buyer.id, product.id).await.unwrap();
        gateway.set_status(&checkout.intent.id, PaymentStatus::Completed);
        settlement.confirm(&checkout.intent.id, buyer.id, product.id, None).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    });
    assert_eq!(stuck.count(), 1);
}

#[test]
fn refund_required_hook_fires_when_a_paid_order_cannot_settle() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let refund = HookCalled::default();
    let refund_copy = refund.clone();
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_refund_required(move |ev| {
            info!("🪝️ refund required for intent {} ({})", ev.intent_id, ev.amount);
            refund_copy.called();
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = setup().await;
        let gateway = MockGateway::new();
        let settlement = SettlementApi::new(db.clone(), gateway.clone()).with_producers(producers);

        let seller = seed_user(db.pool(), "silvia").await;
        let product = seed_product(db.pool(), &seller, "Pote de mel", Money::from_reais(40), 1).await;
        let first = seed_user(db.pool(), "tonia").await;
        let second = seed_user(db.pool(), "ulisses").await;
        let first_checkout = settlement.initiate(first.id, product.id).await.unwrap();
        let second_checkout = settlement.initiate(second.id, product.id).await.unwrap();
        gateway.set_status(&first_checkout.intent.id, PaymentStatus::Completed);
        gateway.set_status(&second_checkout.intent.id, PaymentStatus::Completed);

        settlement.confirm(&first_checkout.intent.id, first.id, product.id, None).await.unwrap();
        let result = settlement.confirm(&second_checkout.intent.id, second.id, product.id, None).await;
        assert!(result.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    });
    assert_eq!(refund.count(), 1);
}
