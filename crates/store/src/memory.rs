use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{ItemId, OrderId, PaymentId, ShipmentId};
use domain::{Order, OrderStatus, Payment, PaymentStatus, Shipment, StockItem};
use tokio::sync::RwLock;

use crate::{
    DEFAULT_LOCK_TIMEOUT, Result,
    lock::{RowGuard, RowKey, RowLocks},
    store::{Store, UnitOfWork},
    trace::UowTrace,
};

#[derive(Default)]
struct Tables {
    items: HashMap<ItemId, StockItem>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<PaymentId, Payment>,
    shipments: HashMap<ShipmentId, Shipment>,
}

impl Tables {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.orders.is_empty()
            && self.payments.is_empty()
            && self.shipments.is_empty()
    }

    fn apply(&mut self, staged: Tables) {
        self.items.extend(staged.items);
        self.orders.extend(staged.orders);
        self.payments.extend(staged.payments);
        self.shipments.extend(staged.shipments);
    }
}

/// Reads `id`, preferring this unit's staged copy over the committed one.
fn overlay<K: Eq + Hash, V: Clone>(
    committed: &HashMap<K, V>,
    staged: &HashMap<K, V>,
    id: &K,
) -> Option<V> {
    staged.get(id).or_else(|| committed.get(id)).cloned()
}

/// Every row visible to a unit of work: committed rows shadowed by staged ones.
fn merged<'a, K: Eq + Hash, V>(
    committed: &'a HashMap<K, V>,
    staged: &'a HashMap<K, V>,
) -> impl Iterator<Item = &'a V> {
    committed
        .iter()
        .filter(move |(id, _)| !staged.contains_key(id))
        .map(|(_, v)| v)
        .chain(staged.values())
}

/// In-memory store for tests and single-process deployments.
///
/// Row locks are a keyed table of async mutexes, one per row identity. Writes
/// are staged in the unit of work and applied to the shared tables on commit,
/// before the unit's locks are released.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    locks: RowLocks,
    lock_timeout: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: Arc::default(),
            locks: RowLocks::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets how long `lock_*` calls wait for a row held elsewhere.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Clears all committed rows.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        Ok(InMemoryUnitOfWork {
            trace: UowTrace::begin("memory"),
            tables: Arc::clone(&self.tables),
            locks: self.locks.clone(),
            lock_timeout: self.lock_timeout,
            held: HashMap::new(),
            staged: Tables::default(),
        })
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    trace: UowTrace,
    tables: Arc<RwLock<Tables>>,
    locks: RowLocks,
    lock_timeout: Duration,
    held: HashMap<RowKey, RowGuard>,
    staged: Tables,
}

impl InMemoryUnitOfWork {
    /// Takes the row lock unless already held. Returns true if newly taken.
    async fn acquire(&mut self, key: RowKey) -> Result<bool> {
        if self.held.contains_key(&key) {
            return Ok(false);
        }
        let guard = self.locks.acquire(key, self.lock_timeout).await?;
        tracing::trace!(uow = %self.trace.id(), resource = %key, "Row lock acquired");
        self.held.insert(key, guard);
        Ok(true)
    }

    /// Locks `key`, then reads the row. A lock taken for a missing row is
    /// released again, matching `SELECT ... FOR UPDATE` on no rows.
    async fn lock_row<T>(
        &mut self,
        key: RowKey,
        read: impl FnOnce(&Tables, &Tables) -> Option<T>,
    ) -> Result<Option<T>> {
        let newly_held = self.acquire(key).await?;
        let row = {
            let tables = self.tables.read().await;
            read(&tables, &self.staged)
        };
        if row.is_none() && newly_held {
            self.held.remove(&key);
        }
        Ok(row)
    }

    /// Number of row locks currently held.
    pub fn held_locks(&self) -> usize {
        self.held.len()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find_item(&mut self, id: ItemId) -> Result<Option<StockItem>> {
        let tables = self.tables.read().await;
        Ok(overlay(&tables.items, &self.staged.items, &id))
    }

    async fn lock_item(&mut self, id: ItemId) -> Result<Option<StockItem>> {
        self.lock_row(RowKey::Item(id), |committed, staged| {
            overlay(&committed.items, &staged.items, &id)
        })
        .await
    }

    async fn save_item(&mut self, item: &StockItem) -> Result<()> {
        self.staged.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(overlay(&tables.orders, &self.staged.orders, &id))
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.lock_row(RowKey::Order(id), |committed, staged| {
            overlay(&committed.orders, &staged.orders, &id)
        })
        .await
    }

    async fn save_order(&mut self, order: &Order) -> Result<()> {
        self.staged.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn order_exists_with_status(
        &mut self,
        item_id: ItemId,
        status: OrderStatus,
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(merged(&tables.orders, &self.staged.orders)
            .any(|o| o.item_id() == item_id && o.status() == status))
    }

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(overlay(&tables.payments, &self.staged.payments, &id))
    }

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        self.lock_row(RowKey::Payment(id), |committed, staged| {
            overlay(&committed.payments, &staged.payments, &id)
        })
        .await
    }

    async fn save_payment(&mut self, payment: &Payment) -> Result<()> {
        self.staged.payments.insert(payment.id(), payment.clone());
        Ok(())
    }

    async fn payment_exists_with_status(
        &mut self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(merged(&tables.payments, &self.staged.payments)
            .any(|p| p.order_id() == order_id && p.status() == status))
    }

    async fn payments_for_order(&mut self, order_id: OrderId) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<_> = merged(&tables.payments, &self.staged.payments)
            .filter(|p| p.order_id() == order_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.created_at(), p.id()));
        Ok(payments)
    }

    async fn find_shipment(&mut self, id: ShipmentId) -> Result<Option<Shipment>> {
        let tables = self.tables.read().await;
        Ok(overlay(&tables.shipments, &self.staged.shipments, &id))
    }

    async fn lock_shipment(&mut self, id: ShipmentId) -> Result<Option<Shipment>> {
        self.lock_row(RowKey::Shipment(id), |committed, staged| {
            overlay(&committed.shipments, &staged.shipments, &id)
        })
        .await
    }

    async fn save_shipment(&mut self, shipment: &Shipment) -> Result<()> {
        self.staged.shipments.insert(shipment.id(), shipment.clone());
        Ok(())
    }

    async fn shipments_for_order(&mut self, order_id: OrderId) -> Result<Vec<Shipment>> {
        let tables = self.tables.read().await;
        let mut shipments: Vec<_> = merged(&tables.shipments, &self.staged.shipments)
            .filter(|s| s.order_id() == order_id)
            .cloned()
            .collect();
        shipments.sort_by_key(|s| s.created_at());
        Ok(shipments)
    }

    async fn commit(mut self) -> Result<()> {
        if !self.staged.is_empty() {
            // Publish before the guards drop so the next lock holder sees it.
            let staged = std::mem::take(&mut self.staged);
            self.tables.write().await.apply(staged);
        }
        self.trace.committed();
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.trace.rolled_back();
        Ok(())
    }
}
