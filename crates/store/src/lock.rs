use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{ItemId, OrderId, PaymentId, ShipmentId};
use tokio::sync::OwnedMutexGuard;

use crate::{Result, StoreError};

/// Identity of a lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Item(ItemId),
    Order(OrderId),
    Payment(PaymentId),
    Shipment(ShipmentId),
}

impl RowKey {
    /// Name of the table the row lives in, used as a metrics label.
    pub fn table(&self) -> &'static str {
        match self {
            RowKey::Item(_) => "stock_items",
            RowKey::Order(_) => "orders",
            RowKey::Payment(_) => "payments",
            RowKey::Shipment(_) => "shipments",
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Item(id) => write!(f, "{}/{}", self.table(), id),
            RowKey::Order(id) => write!(f, "{}/{}", self.table(), id),
            RowKey::Payment(id) => write!(f, "{}/{}", self.table(), id),
            RowKey::Shipment(id) => write!(f, "{}/{}", self.table(), id),
        }
    }
}

type LockMap = HashMap<RowKey, Arc<tokio::sync::Mutex<()>>>;

/// Keyed row-lock table.
///
/// Lazily creates one async mutex per row and returns the same `Arc` for
/// repeated lookups. An entry is removed when its last guard is released
/// and no other caller is waiting on it.
#[derive(Clone, Default)]
pub(crate) struct RowLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive hold on one row. Releases the row on drop.
#[derive(Debug)]
pub(crate) struct RowGuard {
    key: RowKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // The map holds one reference; anything above that is a waiter.
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        if locks
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

impl RowLocks {
    fn get(&self, key: RowKey) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(locks.entry(key).or_default().clone())
    }

    /// Number of rows with a live entry in the table.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Waits at most `timeout` for the row lock on `key`.
    pub(crate) async fn acquire(
        &self,
        key: RowKey,
        timeout: Duration,
    ) -> Result<RowGuard> {
        let mutex = self.get(key)?;
        let started = Instant::now();

        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                metrics::histogram!("lock_wait_seconds", "table" => key.table())
                    .record(started.elapsed().as_secs_f64());
                Ok(RowGuard {
                    key,
                    guard: Some(guard),
                    locks: Arc::clone(&self.locks),
                })
            }
            Err(_) => {
                metrics::counter!("lock_timeouts_total", "table" => key.table()).increment(1);
                tracing::warn!(resource = %key, waited_ms = timeout.as_millis() as u64, "Lock wait timed out");
                Err(StoreError::LockTimeout {
                    resource: key.to_string(),
                    waited: timeout,
                })
            }
        }
    }
}
