//! Orchestrates the order fulfillment saga.

use common::{ItemId, Money};
use domain::{Order, Payment, Shipment};
use serde::Serialize;
use store::Store;

use crate::error::{SagaError, ServiceError};
use crate::order_fulfillment::{self, OrderSagaContext};
use crate::runner::SagaRunner;
use crate::services::Services;

/// What a completed saga produced.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSagaOutcome {
    pub order: Order,
    pub payment: Payment,
    pub shipment: Shipment,
}

/// Runs order creation, payment, and shipment as one logical attempt.
///
/// Each step commits on its own. When a step fails the completed steps are
/// compensated in reverse before the failure is returned, so a caller sees
/// either a shipped order or an error. Steps are never retried here; a
/// caller that gets a retryable error re-runs the whole saga.
pub struct OrderSagaOrchestrator<S> {
    services: Services<S>,
    runner: SagaRunner<OrderSagaContext>,
}

impl<S> OrderSagaOrchestrator<S>
where
    S: Store + Clone + 'static,
{
    pub fn new(store: S) -> Self {
        Self::with_services(Services::new(store))
    }

    pub fn with_services(services: Services<S>) -> Self {
        let runner = order_fulfillment::order_saga(&services);
        Self { services, runner }
    }

    pub fn services(&self) -> &Services<S> {
        &self.services
    }

    /// Executes the saga for `quantity` units of `item_id`, paid with
    /// `amount` via `method`.
    #[tracing::instrument(skip(self, method), fields(saga_type = order_fulfillment::SAGA_TYPE))]
    pub async fn run_order_saga(
        &self,
        item_id: ItemId,
        quantity: u32,
        amount: Money,
        method: impl Into<String> + Send,
    ) -> Result<OrderSagaOutcome, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let mut ctx = OrderSagaContext::new(item_id, quantity, amount, method);
        let result = self.runner.run(&mut ctx).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);

        if let Err(e) = result {
            tracing::warn!(failed_step = e.failed_step(), kind = %e.kind(), duration, "saga failed");
            return Err(e);
        }

        let outcome = into_outcome(ctx)?;
        metrics::counter!("saga_completed_total").increment(1);
        tracing::info!(
            order_id = %outcome.order.id(),
            payment_id = %outcome.payment.id(),
            shipment_id = %outcome.shipment.id(),
            duration,
            "saga completed successfully"
        );
        Ok(outcome)
    }
}

fn into_outcome(ctx: OrderSagaContext) -> Result<OrderSagaOutcome, SagaError> {
    let missing = |what: &str| SagaError::StepFailed {
        step: order_fulfillment::STEP_DISPATCH_SHIPMENT,
        source: ServiceError::postcondition(
            order_fulfillment::STEP_DISPATCH_SHIPMENT,
            format!("saga finished without a {what}"),
        ),
    };
    Ok(OrderSagaOutcome {
        order: ctx.order.ok_or_else(|| missing("order"))?,
        payment: ctx.payment.ok_or_else(|| missing("payment"))?,
        shipment: ctx.shipment.ok_or_else(|| missing("shipment"))?,
    })
}
