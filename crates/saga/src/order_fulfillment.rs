//! The order fulfillment saga: its context and its five steps.

use async_trait::async_trait;
use common::{ItemId, Money};
use domain::{Order, OrderStatus, Payment, PaymentStatus, Shipment, ShipmentStatus};
use store::Store;

use crate::error::{Result, ServiceError};
use crate::runner::{SagaRunner, SagaStep};
use crate::services::Services;

/// The saga type identifier for order fulfillment.
pub const SAGA_TYPE: &str = "OrderFulfillment";

/// Step name: Reserve stock and record a pending order.
pub const STEP_CREATE_ORDER: &str = "create_order";

/// Step name: Record a pending payment for the order.
pub const STEP_CREATE_PAYMENT: &str = "create_payment";

/// Step name: Settle the payment and mark the order paid.
pub const STEP_COMPLETE_PAYMENT: &str = "complete_payment";

/// Step name: Record a pending shipment for the paid order.
pub const STEP_CREATE_SHIPMENT: &str = "create_shipment";

/// Step name: Dispatch the shipment.
pub const STEP_DISPATCH_SHIPMENT: &str = "dispatch_shipment";

/// Inputs of one saga attempt and the entities its steps produced so far.
#[derive(Debug, Clone)]
pub struct OrderSagaContext {
    pub item_id: ItemId,
    pub quantity: u32,
    pub amount: Money,
    pub method: String,
    pub order: Option<Order>,
    pub payment: Option<Payment>,
    pub shipment: Option<Shipment>,
}

impl OrderSagaContext {
    pub fn new(item_id: ItemId, quantity: u32, amount: Money, method: impl Into<String>) -> Self {
        Self {
            item_id,
            quantity,
            amount,
            method: method.into(),
            order: None,
            payment: None,
            shipment: None,
        }
    }

    fn order(&self, step: &'static str) -> Result<&Order> {
        self.order
            .as_ref()
            .ok_or_else(|| ServiceError::postcondition(step, "no order recorded"))
    }

    fn payment(&self, step: &'static str) -> Result<&Payment> {
        self.payment
            .as_ref()
            .ok_or_else(|| ServiceError::postcondition(step, "no payment recorded"))
    }

    fn shipment(&self, step: &'static str) -> Result<&Shipment> {
        self.shipment
            .as_ref()
            .ok_or_else(|| ServiceError::postcondition(step, "no shipment recorded"))
    }
}

/// Builds the five-step order saga over `services`.
pub fn order_saga<S>(services: &Services<S>) -> SagaRunner<OrderSagaContext>
where
    S: Store + Clone + 'static,
{
    SagaRunner::new(SAGA_TYPE)
        .step(CreateOrderStep::new(services.clone()))
        .step(CreatePaymentStep::new(services.clone()))
        .step(CompletePaymentStep::new(services.clone()))
        .step(CreateShipmentStep::new(services.clone()))
        .step(DispatchShipmentStep::new(services.clone()))
}

macro_rules! saga_step {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<S> {
            services: Services<S>,
        }

        impl<S> $name<S> {
            pub fn new(services: Services<S>) -> Self {
                Self { services }
            }
        }
    };
}

saga_step!(
    /// Reserves stock and records a pending order. Compensated by releasing
    /// the order.
    CreateOrderStep
);

saga_step!(
    /// Records a pending payment. Compensated by cancelling it.
    CreatePaymentStep
);

saga_step!(
    /// Completes the payment, then moves the order to paid. Nothing to undo
    /// on its own: a completed payment cannot be cancelled.
    CompletePaymentStep
);

saga_step!(
    /// Records a pending shipment. Compensated by cancelling it.
    CreateShipmentStep
);

saga_step!(
    /// Dispatches the shipment. Undone by the shipment's cancellation.
    DispatchShipmentStep
);

#[async_trait]
impl<S: Store + Clone + 'static> SagaStep<OrderSagaContext> for CreateOrderStep<S> {
    fn name(&self) -> &'static str {
        STEP_CREATE_ORDER
    }

    async fn execute(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let order = self
            .services
            .orders
            .create_order(ctx.item_id, ctx.quantity)
            .await?;
        ctx.order = Some(order);
        Ok(())
    }

    fn verify(&self, ctx: &OrderSagaContext) -> Result<()> {
        let order = ctx.order(STEP_CREATE_ORDER)?;
        if order.status() != OrderStatus::Pending || order.quantity() != ctx.quantity {
            return Err(ServiceError::postcondition(
                STEP_CREATE_ORDER,
                format!(
                    "expected a PENDING order for {} units, got {} for {}",
                    ctx.quantity,
                    order.status(),
                    order.quantity()
                ),
            ));
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let order_id = ctx.order(STEP_CREATE_ORDER)?.id();
        self.services.compensation.release_order(order_id).await
    }
}

#[async_trait]
impl<S: Store + Clone + 'static> SagaStep<OrderSagaContext> for CreatePaymentStep<S> {
    fn name(&self) -> &'static str {
        STEP_CREATE_PAYMENT
    }

    async fn execute(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let order_id = ctx.order(STEP_CREATE_PAYMENT)?.id();
        let payment = self
            .services
            .payments
            .create_payment(order_id, ctx.amount, ctx.method.clone())
            .await?;
        ctx.payment = Some(payment);
        Ok(())
    }

    fn verify(&self, ctx: &OrderSagaContext) -> Result<()> {
        let payment = ctx.payment(STEP_CREATE_PAYMENT)?;
        if payment.status() != PaymentStatus::Pending {
            return Err(ServiceError::postcondition(
                STEP_CREATE_PAYMENT,
                format!("expected a PENDING payment, got {}", payment.status()),
            ));
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let payment_id = ctx.payment(STEP_CREATE_PAYMENT)?.id();
        self.services.compensation.cancel_payment(payment_id).await?;
        ctx.payment = Some(self.services.payments.get_payment(payment_id).await?);
        Ok(())
    }
}

#[async_trait]
impl<S: Store + Clone + 'static> SagaStep<OrderSagaContext> for CompletePaymentStep<S> {
    fn name(&self) -> &'static str {
        STEP_COMPLETE_PAYMENT
    }

    async fn execute(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let payment_id = ctx.payment(STEP_COMPLETE_PAYMENT)?.id();
        let order_id = ctx.order(STEP_COMPLETE_PAYMENT)?.id();

        let payment = self.services.payments.complete_payment(payment_id).await?;
        ctx.payment = Some(payment);
        let order = self.services.orders.pay_for_order(order_id).await?;
        ctx.order = Some(order);
        Ok(())
    }

    fn verify(&self, ctx: &OrderSagaContext) -> Result<()> {
        let payment = ctx.payment(STEP_COMPLETE_PAYMENT)?;
        let order = ctx.order(STEP_COMPLETE_PAYMENT)?;
        if payment.status() != PaymentStatus::Completed || order.status() != OrderStatus::Paid {
            return Err(ServiceError::postcondition(
                STEP_COMPLETE_PAYMENT,
                format!(
                    "expected COMPLETED payment and PAID order, got {} and {}",
                    payment.status(),
                    order.status()
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Store + Clone + 'static> SagaStep<OrderSagaContext> for CreateShipmentStep<S> {
    fn name(&self) -> &'static str {
        STEP_CREATE_SHIPMENT
    }

    async fn execute(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let order_id = ctx.order(STEP_CREATE_SHIPMENT)?.id();
        let shipment = self.services.shipments.create_shipment(order_id).await?;
        ctx.shipment = Some(shipment);
        Ok(())
    }

    fn verify(&self, ctx: &OrderSagaContext) -> Result<()> {
        let shipment = ctx.shipment(STEP_CREATE_SHIPMENT)?;
        if shipment.status() != ShipmentStatus::Pending {
            return Err(ServiceError::postcondition(
                STEP_CREATE_SHIPMENT,
                format!("expected a PENDING shipment, got {}", shipment.status()),
            ));
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let shipment_id = ctx.shipment(STEP_CREATE_SHIPMENT)?.id();
        self.services
            .compensation
            .cancel_shipment(shipment_id)
            .await?;
        ctx.shipment = Some(self.services.shipments.get_shipment(shipment_id).await?);
        Ok(())
    }
}

#[async_trait]
impl<S: Store + Clone + 'static> SagaStep<OrderSagaContext> for DispatchShipmentStep<S> {
    fn name(&self) -> &'static str {
        STEP_DISPATCH_SHIPMENT
    }

    async fn execute(&self, ctx: &mut OrderSagaContext) -> Result<()> {
        let shipment_id = ctx.shipment(STEP_DISPATCH_SHIPMENT)?.id();
        let shipment = self.services.shipments.ship(shipment_id).await?;
        ctx.shipment = Some(shipment);
        Ok(())
    }

    fn verify(&self, ctx: &OrderSagaContext) -> Result<()> {
        let shipment = ctx.shipment(STEP_DISPATCH_SHIPMENT)?;
        if shipment.status() != ShipmentStatus::Shipped || shipment.tracking_number().is_none() {
            return Err(ServiceError::postcondition(
                STEP_DISPATCH_SHIPMENT,
                format!("expected a SHIPPED shipment with tracking, got {}", shipment.status()),
            ));
        }
        Ok(())
    }
}
