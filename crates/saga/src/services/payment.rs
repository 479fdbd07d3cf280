//! Payment lifecycle.

use common::{Money, OrderId, PaymentId};
use domain::{Payment, PaymentStatus};
use store::{Store, UnitOfWork, settle};

use crate::error::{Result, ServiceError};

/// Records payments for orders and advances them through their lifecycle.
#[derive(Clone)]
pub struct PaymentService<S> {
    store: S,
}

impl<S: Store> PaymentService<S> {
    /// Creates a new payment service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records a pending payment for an order.
    ///
    /// Holds the order's lock while checking for an existing completed
    /// payment, so the check and the insert are atomic per order.
    #[tracing::instrument(skip(self, method))]
    pub async fn create_payment(
        &self,
        order_id: OrderId,
        amount: Money,
        method: impl Into<String>,
    ) -> Result<Payment> {
        let payment = Payment::create(order_id, amount, method)?;

        let mut uow = self.store.begin().await?;
        let result = self.create_payment_in(&mut uow, payment).await;
        let payment = settle(uow, result).await?;

        tracing::info!(payment_id = %payment.id(), %amount, "Payment created");
        Ok(payment)
    }

    async fn create_payment_in(&self, uow: &mut S::Uow, payment: Payment) -> Result<Payment> {
        let order_id = payment.order_id();
        uow.lock_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))?;

        if uow
            .payment_exists_with_status(order_id, PaymentStatus::Completed)
            .await?
        {
            return Err(ServiceError::DuplicatePayment { order_id });
        }

        uow.save_payment(&payment).await?;
        Ok(payment)
    }

    /// Settles a pending payment.
    ///
    /// Locks the order, then the payment, and rejects the call if another
    /// payment for the same order has already completed.
    #[tracing::instrument(skip(self))]
    pub async fn complete_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let mut uow = self.store.begin().await?;
        let result = self.complete_payment_in(&mut uow, payment_id).await;
        settle(uow, result).await
    }

    async fn complete_payment_in(&self, uow: &mut S::Uow, payment_id: PaymentId) -> Result<Payment> {
        let order_id = uow
            .find_payment(payment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment", payment_id))?
            .order_id();
        uow.lock_order(order_id).await?;

        let mut payment = self.lock_payment(uow, payment_id).await?;
        payment.complete()?;

        if uow
            .payment_exists_with_status(order_id, PaymentStatus::Completed)
            .await?
        {
            return Err(ServiceError::DuplicatePayment { order_id });
        }

        uow.save_payment(&payment).await?;
        Ok(payment)
    }

    /// Marks a payment failed.
    #[tracing::instrument(skip(self))]
    pub async fn fail_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let mut uow = self.store.begin().await?;
        let result = self.transition_in(&mut uow, payment_id, Payment::fail).await;
        settle(uow, result).await
    }

    /// Cancels a payment. A completed payment cannot be cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let mut uow = self.store.begin().await?;
        let result = self.transition_in(&mut uow, payment_id, Payment::cancel).await;
        settle(uow, result).await
    }

    async fn transition_in(
        &self,
        uow: &mut S::Uow,
        payment_id: PaymentId,
        apply: fn(&mut Payment) -> domain::error::Result<()>,
    ) -> Result<Payment> {
        let mut payment = self.lock_payment(uow, payment_id).await?;
        apply(&mut payment)?;
        uow.save_payment(&payment).await?;
        Ok(payment)
    }

    async fn lock_payment(&self, uow: &mut S::Uow, payment_id: PaymentId) -> Result<Payment> {
        uow.lock_payment(payment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment", payment_id))
    }

    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let mut uow = self.store.begin().await?;
        let result = uow.find_payment(payment_id).await.map_err(ServiceError::from);
        settle(uow, result)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment", payment_id))
    }

    /// Payments recorded for an order, oldest first.
    pub async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let mut uow = self.store.begin().await?;
        let result = uow
            .payments_for_order(order_id)
            .await
            .map_err(ServiceError::from);
        settle(uow, result).await
    }
}
