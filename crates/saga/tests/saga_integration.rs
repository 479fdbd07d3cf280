//! Integration tests for the order saga and the locking services.

use std::time::Duration;

use async_trait::async_trait;
use common::{ItemId, Money, OrderId};
use domain::{OrderStatus, PaymentStatus, ShipmentStatus, StockItem};
use saga::order_fulfillment::{
    CompletePaymentStep, CreateOrderStep, CreatePaymentStep, CreateShipmentStep,
    OrderSagaContext, STEP_CREATE_ORDER,
};
use saga::{ErrorKind, OrderSagaOrchestrator, SagaError, SagaRunner, SagaStep, ServiceError, Services};
use store::{InMemoryStore, Store, StoreExt, UnitOfWork};

struct TestHarness {
    store: InMemoryStore,
    saga: OrderSagaOrchestrator<InMemoryStore>,
    item_id: ItemId,
}

impl TestHarness {
    async fn new(stock: u32) -> Self {
        Self::with_store(InMemoryStore::new(), stock).await
    }

    async fn with_store(store: InMemoryStore, stock: u32) -> Self {
        let item = StockItem::new("Widget", stock, Money::from_cents(100), None).unwrap();
        store.insert_stock_item(&item).await.unwrap();
        Self {
            saga: OrderSagaOrchestrator::new(store.clone()),
            store,
            item_id: item.id(),
        }
    }

    fn services(&self) -> &Services<InMemoryStore> {
        self.saga.services()
    }

    async fn stock(&self) -> u32 {
        self.store
            .get_item(self.item_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity()
    }

    async fn has_order_in(&self, status: OrderStatus) -> bool {
        let mut uow = self.store.begin().await.unwrap();
        let exists = uow
            .order_exists_with_status(self.item_id, status)
            .await
            .unwrap();
        uow.commit().await.unwrap();
        exists
    }

    async fn has_any_order(&self) -> bool {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            if self.has_order_in(status).await {
                return true;
            }
        }
        false
    }
}

/// A step that always fails, placed after the steps under test.
struct Refuse;

#[async_trait]
impl SagaStep<OrderSagaContext> for Refuse {
    fn name(&self) -> &'static str {
        "refuse"
    }

    async fn execute(&self, _ctx: &mut OrderSagaContext) -> saga::error::Result<()> {
        Err(ServiceError::postcondition("refuse", "injected failure"))
    }
}

#[tokio::test]
async fn test_happy_path_full_order_fulfillment() {
    let h = TestHarness::new(10).await;

    let outcome = h
        .saga
        .run_order_saga(h.item_id, 2, Money::from_cents(200), "card")
        .await
        .unwrap();

    assert_eq!(outcome.order.status(), OrderStatus::Paid);
    assert_eq!(outcome.order.total_amount(), Money::from_cents(200));
    assert_eq!(outcome.payment.status(), PaymentStatus::Completed);
    assert_eq!(outcome.shipment.status(), ShipmentStatus::Shipped);
    assert!(outcome.shipment.dispatched_at().is_some());
    assert_eq!(h.stock().await, 8);

    // Everything the saga returned was persisted as returned.
    let order = h.services().orders.get_order(outcome.order.id()).await.unwrap();
    assert_eq!(order, outcome.order);
    let payments = h
        .services()
        .payments
        .payments_for_order(order.id())
        .await
        .unwrap();
    assert_eq!(payments, vec![outcome.payment]);
    let shipments = h
        .services()
        .shipments
        .shipments_for_order(order.id())
        .await
        .unwrap();
    assert_eq!(shipments, vec![outcome.shipment]);
}

#[tokio::test]
async fn test_insufficient_stock_persists_nothing() {
    let h = TestHarness::new(10).await;

    let err = h
        .saga
        .run_order_saga(h.item_id, 20, Money::from_cents(2000), "card")
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::StepFailed { step: STEP_CREATE_ORDER, .. }));
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(h.stock().await, 10);
    assert!(!h.has_any_order().await);
}

#[tokio::test]
async fn test_payment_rejection_restores_stock_and_cancels_order() {
    let h = TestHarness::new(10).await;

    let err = h
        .saga
        .run_order_saga(h.item_id, 4, Money::from_cents(-500), "card")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(h.stock().await, 10);
    assert!(h.has_order_in(OrderStatus::Cancelled).await);
    assert!(!h.has_order_in(OrderStatus::Pending).await);
}

#[tokio::test]
async fn test_saga_can_run_again_after_compensation() {
    let h = TestHarness::new(10).await;

    h.saga
        .run_order_saga(h.item_id, 4, Money::from_cents(-1), "card")
        .await
        .unwrap_err();
    let outcome = h
        .saga
        .run_order_saga(h.item_id, 4, Money::from_cents(400), "card")
        .await
        .unwrap();

    assert_eq!(outcome.order.status(), OrderStatus::Paid);
    assert_eq!(h.stock().await, 6);
}

#[tokio::test]
async fn test_failure_after_payment_creation_cancels_payment_and_order() {
    let h = TestHarness::new(10).await;
    let services = h.services().clone();
    let runner = SagaRunner::new("Test")
        .step(CreateOrderStep::new(services.clone()))
        .step(CreatePaymentStep::new(services.clone()))
        .step(Refuse);

    let mut ctx = OrderSagaContext::new(h.item_id, 3, Money::from_cents(300), "card");
    let err = runner.run(&mut ctx).await.unwrap_err();

    assert_eq!(err.failed_step(), "refuse");
    assert_eq!(err.kind(), ErrorKind::Postcondition);

    let payment = ctx.payment.unwrap();
    let payment = services.payments.get_payment(payment.id()).await.unwrap();
    assert_eq!(payment.status(), PaymentStatus::Cancelled);

    let order = services.orders.get_order(ctx.order.unwrap().id()).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(h.stock().await, 10);
}

#[tokio::test]
async fn test_failure_after_completed_payment_needs_an_operator() {
    let h = TestHarness::new(10).await;
    let services = h.services().clone();
    let runner = SagaRunner::new("Test")
        .step(CreateOrderStep::new(services.clone()))
        .step(CreatePaymentStep::new(services.clone()))
        .step(CompletePaymentStep::new(services.clone()))
        .step(CreateShipmentStep::new(services.clone()))
        .step(Refuse);

    let mut ctx = OrderSagaContext::new(h.item_id, 2, Money::from_cents(200), "card");
    let err = runner.run(&mut ctx).await.unwrap_err();

    match &err {
        SagaError::CompensationFailed {
            failed_step,
            compensation_step,
            source,
            cause,
        } => {
            assert_eq!(*failed_step, "refuse");
            assert_eq!(*compensation_step, "create_payment");
            assert_eq!(source.kind(), ErrorKind::InvalidTransition);
            assert_eq!(cause.kind(), ErrorKind::Postcondition);
        }
        other => panic!("expected CompensationFailed, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::CompensationFailed);

    // The shipment was undone before the payment compensation failed.
    let shipment = ctx.shipment.unwrap();
    let shipment = services.shipments.get_shipment(shipment.id()).await.unwrap();
    assert_eq!(shipment.status(), ShipmentStatus::Cancelled);

    // Unwinding stopped, so the order keeps its stock.
    assert_eq!(h.stock().await, 8);
}

#[tokio::test]
async fn test_lock_timeout_is_retryable() {
    let store = InMemoryStore::new().with_lock_timeout(Duration::from_millis(50));
    let h = TestHarness::with_store(store, 10).await;

    let mut holder = h.store.begin().await.unwrap();
    holder.lock_item(h.item_id).await.unwrap();

    let err = h
        .saga
        .run_order_saga(h.item_id, 1, Money::from_cents(100), "card")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LockTimeout);
    assert!(err.kind().is_retryable());
    assert_eq!(err.failed_step(), STEP_CREATE_ORDER);

    holder.rollback().await.unwrap();

    let outcome = h
        .saga
        .run_order_saga(h.item_id, 1, Money::from_cents(100), "card")
        .await
        .unwrap();
    assert_eq!(outcome.shipment.status(), ShipmentStatus::Shipped);
    assert_eq!(h.stock().await, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_order_single_winner() {
    let h = TestHarness::new(100).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let orders = h.services().orders.clone();
        let item_id = h.item_id;
        handles.push(tokio::spawn(async move {
            orders.create_order(item_id, 10).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                assert_eq!(order.quantity(), 10);
                successes += 1;
            }
            Err(e) => assert_eq!(e.kind(), ErrorKind::DuplicateOrder),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(h.stock().await, 90);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pay_for_order_single_winner() {
    let h = TestHarness::new(10).await;
    let order = h.services().orders.create_order(h.item_id, 1).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orders = h.services().orders.clone();
            let order_id: OrderId = order.id();
            tokio::spawn(async move { orders.pay_for_order(order_id).await })
        })
        .collect();

    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                assert_eq!(order.status(), OrderStatus::Paid);
                paid += 1;
            }
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidTransition),
        }
    }
    assert_eq!(paid, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sagas_on_distinct_items() {
    let store = InMemoryStore::new();
    let mut items = Vec::new();
    for i in 0..5 {
        let item = StockItem::new(format!("Item {i}"), 5, Money::from_cents(50), None).unwrap();
        store.insert_stock_item(&item).await.unwrap();
        items.push(item.id());
    }
    let saga = std::sync::Arc::new(OrderSagaOrchestrator::new(store.clone()));

    let handles: Vec<_> = items
        .iter()
        .map(|&item_id| {
            let saga = saga.clone();
            tokio::spawn(async move {
                saga.run_order_saga(item_id, 2, Money::from_cents(100), "card")
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    for item_id in items {
        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.stock_quantity(), 3);
    }
}
