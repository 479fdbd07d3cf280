use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{ItemId, Money, OrderId, PaymentId, ShipmentId};
use domain::{
    Order, OrderStatus, ParseStatusError, Payment, PaymentStatus, Shipment, StockItem,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    DEFAULT_LOCK_TIMEOUT, Result, StoreError,
    lock::RowKey,
    store::{Store, UnitOfWork},
    trace::UowTrace,
};

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

const ITEM_COLUMNS: &str = "id, name, stock_quantity, price_cents, description";
const ORDER_COLUMNS: &str = "id, item_id, quantity, total_amount_cents, status, created_at";
const PAYMENT_COLUMNS: &str = "id, order_id, amount_cents, method, status, created_at, updated_at";
const SHIPMENT_COLUMNS: &str = "id, order_id, status, tracking_number, created_at, dispatched_at";

/// PostgreSQL-backed store.
///
/// Each unit of work is a database transaction. Row locks are taken with
/// `SELECT ... FOR UPDATE` and bounded by a transaction-local `lock_timeout`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets how long `lock_*` calls wait for a row held elsewhere.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Uow = PostgresUnitOfWork;

    async fn begin(&self) -> Result<PostgresUnitOfWork> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(PostgresUnitOfWork {
            trace: UowTrace::begin("postgres"),
            tx,
            lock_timeout: self.lock_timeout,
        })
    }
}

/// Unit of work over a [`PostgresStore`]: one open transaction.
///
/// Dropping it rolls the transaction back.
pub struct PostgresUnitOfWork {
    trace: UowTrace,
    tx: Transaction<'static, Postgres>,
    lock_timeout: Duration,
}

impl PostgresUnitOfWork {
    /// Runs a `FOR UPDATE` select for one row, mapping an expired
    /// `lock_timeout` onto [`StoreError::LockTimeout`].
    async fn lock_row(&mut self, key: RowKey, sql: &str, id: Uuid) -> Result<Option<PgRow>> {
        let started = Instant::now();
        let result = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await;

        match result {
            Ok(row) => {
                metrics::histogram!("lock_wait_seconds", "table" => key.table())
                    .record(started.elapsed().as_secs_f64());
                Ok(row)
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) =>
            {
                metrics::counter!("lock_timeouts_total", "table" => key.table()).increment(1);
                tracing::warn!(
                    uow = %self.trace.id(),
                    resource = %key,
                    waited_ms = self.lock_timeout.as_millis() as u64,
                    "Lock wait timed out"
                );
                Err(StoreError::LockTimeout {
                    resource: key.to_string(),
                    waited: self.lock_timeout,
                })
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn fetch_one_by_id(&mut self, sql: &str, id: Uuid) -> Result<Option<PgRow>> {
        Ok(sqlx::query(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn parse_status<S>(row: &PgRow) -> Result<S>
where
    S: FromStr<Err = ParseStatusError>,
{
    let raw: String = row.try_get("status")?;
    raw.parse().map_err(|e: ParseStatusError| StoreError::Corrupt(e.to_string()))
}

fn row_to_item(row: PgRow) -> Result<StockItem> {
    Ok(StockItem::from_parts(
        ItemId::from_uuid(row.try_get("id")?),
        row.try_get("name")?,
        to_u32(row.try_get("stock_quantity")?, "stock_quantity")?,
        Money::from_cents(row.try_get("price_cents")?),
        row.try_get("description")?,
    ))
}

fn row_to_order(row: PgRow) -> Result<Order> {
    Ok(Order::from_parts(
        OrderId::from_uuid(row.try_get("id")?),
        ItemId::from_uuid(row.try_get("item_id")?),
        to_u32(row.try_get("quantity")?, "quantity")?,
        Money::from_cents(row.try_get("total_amount_cents")?),
        parse_status(&row)?,
        row.try_get("created_at")?,
    ))
}

fn row_to_payment(row: PgRow) -> Result<Payment> {
    Ok(Payment::from_parts(
        PaymentId::from_uuid(row.try_get("id")?),
        OrderId::from_uuid(row.try_get("order_id")?),
        Money::from_cents(row.try_get("amount_cents")?),
        row.try_get("method")?,
        parse_status(&row)?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn row_to_shipment(row: PgRow) -> Result<Shipment> {
    Ok(Shipment::from_parts(
        ShipmentId::from_uuid(row.try_get("id")?),
        OrderId::from_uuid(row.try_get("order_id")?),
        parse_status(&row)?,
        row.try_get("tracking_number")?,
        row.try_get("created_at")?,
        row.try_get("dispatched_at")?,
    ))
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn find_item(&mut self, id: ItemId) -> Result<Option<StockItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM stock_items WHERE id = $1");
        self.fetch_one_by_id(&sql, id.as_uuid())
            .await?
            .map(row_to_item)
            .transpose()
    }

    async fn lock_item(&mut self, id: ItemId) -> Result<Option<StockItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM stock_items WHERE id = $1 FOR UPDATE");
        self.lock_row(RowKey::Item(id), &sql, id.as_uuid())
            .await?
            .map(row_to_item)
            .transpose()
    }

    async fn save_item(&mut self, item: &StockItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_items (id, name, stock_quantity, price_cents, description)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                stock_quantity = EXCLUDED.stock_quantity,
                price_cents = EXCLUDED.price_cents,
                description = EXCLUDED.description
            "#,
        )
        .bind(item.id().as_uuid())
        .bind(item.name())
        .bind(i64::from(item.stock_quantity()))
        .bind(item.price().cents())
        .bind(item.description())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        self.fetch_one_by_id(&sql, id.as_uuid())
            .await?
            .map(row_to_order)
            .transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        self.lock_row(RowKey::Order(id), &sql, id.as_uuid())
            .await?
            .map(row_to_order)
            .transpose()
    }

    async fn save_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, item_id, quantity, total_amount_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.item_id().as_uuid())
        .bind(i64::from(order.quantity()))
        .bind(order.total_amount().cents())
        .bind(order.status().to_string())
        .bind(order.created_at())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn order_exists_with_status(
        &mut self,
        item_id: ItemId,
        status: OrderStatus,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE item_id = $1 AND status = $2)",
        )
        .bind(item_id.as_uuid())
        .bind(status.to_string())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        self.fetch_one_by_id(&sql, id.as_uuid())
            .await?
            .map(row_to_payment)
            .transpose()
    }

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE");
        self.lock_row(RowKey::Payment(id), &sql, id.as_uuid())
            .await?
            .map(row_to_payment)
            .transpose()
    }

    async fn save_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, method, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(payment.id().as_uuid())
        .bind(payment.order_id().as_uuid())
        .bind(payment.amount().cents())
        .bind(payment.method())
        .bind(payment.status().to_string())
        .bind(payment.created_at())
        .bind(payment.updated_at())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn payment_exists_with_status(
        &mut self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND status = $2)",
        )
        .bind(order_id.as_uuid())
        .bind(status.to_string())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn payments_for_order(&mut self, order_id: OrderId) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(row_to_payment).collect()
    }

    async fn find_shipment(&mut self, id: ShipmentId) -> Result<Option<Shipment>> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1");
        self.fetch_one_by_id(&sql, id.as_uuid())
            .await?
            .map(row_to_shipment)
            .transpose()
    }

    async fn lock_shipment(&mut self, id: ShipmentId) -> Result<Option<Shipment>> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1 FOR UPDATE");
        self.lock_row(RowKey::Shipment(id), &sql, id.as_uuid())
            .await?
            .map(row_to_shipment)
            .transpose()
    }

    async fn save_shipment(&mut self, shipment: &Shipment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shipments (id, order_id, status, tracking_number, created_at, dispatched_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                tracking_number = EXCLUDED.tracking_number,
                dispatched_at = EXCLUDED.dispatched_at
            "#,
        )
        .bind(shipment.id().as_uuid())
        .bind(shipment.order_id().as_uuid())
        .bind(shipment.status().to_string())
        .bind(shipment.tracking_number())
        .bind(shipment.created_at())
        .bind(shipment.dispatched_at())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn shipments_for_order(&mut self, order_id: OrderId) -> Result<Vec<Shipment>> {
        let sql = format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(row_to_shipment).collect()
    }

    async fn commit(mut self) -> Result<()> {
        self.tx.commit().await?;
        self.trace.committed();
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.tx.rollback().await?;
        self.trace.rolled_back();
        Ok(())
    }
}
