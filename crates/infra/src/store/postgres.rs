//! Postgres-backed order and inventory stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key / check violation) | `23503`, `23514` | `Conflict` |
//! | Database (other) | any other | `Unavailable` |
//! | PoolClosed, Io, Tls, timeouts | N/A | `Unavailable` |
//! | ColumnDecode / Decode | N/A | `Corrupt` |
//!
//! ## Atomicity
//!
//! Every mutating call runs in its own transaction: an order row and its item
//! rows are committed together, so readers never see a half-written order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use orderflow_core::{Entity, Money, OrderId};
use orderflow_inventory::InventoryRecord;
use orderflow_orders::{Fulfillment, NewOrder, Order, OrderItem, OrderStatus};

use super::r#trait::{InventoryStore, OrderStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id            BIGSERIAL PRIMARY KEY,
    customer_id   TEXT        NOT NULL,
    total_amount  NUMERIC     NOT NULL,
    status        TEXT        NOT NULL,
    discount      NUMERIC     NOT NULL DEFAULT 0,
    created_at    TIMESTAMPTZ NOT NULL,
    processed_at  TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS order_items (
    order_id      BIGINT  NOT NULL REFERENCES orders (id),
    line_no       INTEGER NOT NULL,
    product_code  TEXT    NOT NULL,
    quantity      BIGINT  NOT NULL,
    price         NUMERIC NOT NULL,
    PRIMARY KEY (order_id, line_no)
);

CREATE TABLE IF NOT EXISTS inventory (
    product_code       TEXT PRIMARY KEY,
    product_name       TEXT    NOT NULL,
    available_quantity BIGINT  NOT NULL,
    price              NUMERIC NOT NULL
);
"#;

/// Create the tables used by the Postgres stores if they do not exist.
#[instrument(skip(pool), err)]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    Ok(())
}

/// Postgres-backed order store.
///
/// `orders` holds the creation data plus the fulfillment projection;
/// `order_items` holds the lines keyed by `(order_id, line_no)` so insertion
/// order survives a round trip.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: Arc<PgPool>,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn load_items(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_code, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id ASC, line_no ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_items", e))?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: i64 = row.try_get("order_id").map_err(corrupt)?;
            let item = OrderItem::new(
                row.try_get::<String, _>("product_code").map_err(corrupt)?,
                row.try_get::<i64, _>("quantity").map_err(corrupt)?,
                Money::new(row.try_get::<Decimal, _>("price").map_err(corrupt)?),
            );
            items.entry(order_id).or_default().push(item);
        }
        Ok(items)
    }
}

struct OrderRow {
    id: i64,
    customer_id: String,
    total_amount: Decimal,
    status: String,
    discount: Decimal,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            discount: row.try_get("discount")?,
            created_at: row.try_get("created_at")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let id = OrderId::new(self.id).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e: orderflow_core::DomainError| StoreError::Corrupt(e.to_string()))?;

        Ok(Order::restore(
            id,
            self.customer_id,
            items,
            Money::new(self.total_amount),
            self.created_at,
            Fulfillment {
                status,
                discount: Money::new(self.discount),
                processed_at: self.processed_at,
            },
        ))
    }
}

const SELECT_ORDERS: &str = r#"
    SELECT id, customer_id, total_amount, status, discount, created_at, processed_at
    FROM orders
"#;

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(
        skip(self, order),
        fields(customer_id = %order.customer_id(), order_id = tracing::field::Empty),
        err
    )]
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;

        let fulfillment = Fulfillment::default();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, total_amount, status, discount, created_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(order.customer_id())
        .bind(order.total_amount().amount())
        .bind(fulfillment.status.as_str())
        .bind(fulfillment.discount.amount())
        .bind(order.created_at())
        .bind(fulfillment.processed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        insert_items(&mut tx, id, order.items()).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;

        Span::current().record("order_id", id);
        let id = OrderId::new(id).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(order.with_id(id))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id(), status = %order.status()), err)]
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("save_order", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, discount = $3, processed_at = $4
            WHERE id = $1
            "#,
        )
        .bind(order.id().as_i64())
        .bind(order.status().as_str())
        .bind(order.discount().amount())
        .bind(order.processed_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {}", order.id())));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("save_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDERS} WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.load_items(&[row.id]).await?;
        let lines = items.remove(&row.id).unwrap_or_default();
        row.into_order(lines).map(Some)
    }

    #[instrument(skip(self), fields(order_count = tracing::field::Empty), err)]
    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDERS} ORDER BY id ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;

        Span::current().record("order_count", rows.len());

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    items: &[OrderItem],
) -> Result<(), StoreError> {
    for (line_no, item) in items.iter().enumerate() {
        let line_no = i32::try_from(line_no)
            .map_err(|_| StoreError::Conflict("too many order lines".to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, line_no, product_code, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(line_no)
        .bind(&item.product_code)
        .bind(item.quantity)
        .bind(item.price.amount())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_items", e))?;
    }
    Ok(())
}

/// Postgres-backed inventory store (`inventory` table, keyed by product code).
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn inventory_from_row(row: &sqlx::postgres::PgRow) -> Result<InventoryRecord, StoreError> {
    Ok(InventoryRecord::new(
        row.try_get::<String, _>("product_code").map_err(corrupt)?,
        row.try_get::<String, _>("product_name").map_err(corrupt)?,
        row.try_get::<i64, _>("available_quantity").map_err(corrupt)?,
        Money::new(row.try_get::<Decimal, _>("price").map_err(corrupt)?),
    ))
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), err)]
    async fn find_by_product_code(&self, code: &str) -> Result<Option<InventoryRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT product_code, product_name, available_quantity, price
            FROM inventory
            WHERE product_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_inventory", e))?;

        row.as_ref().map(inventory_from_row).transpose()
    }

    #[instrument(skip(self, record), fields(product_code = %record.id()), err)]
    async fn upsert(&self, record: InventoryRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory (product_code, product_name, available_quantity, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_code)
            DO UPDATE SET
                product_name = EXCLUDED.product_name,
                available_quantity = EXCLUDED.available_quantity,
                price = EXCLUDED.price
            "#,
        )
        .bind(&record.product_code)
        .bind(&record.product_name)
        .bind(record.available_quantity)
        .bind(record.price.amount())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_inventory", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_inventory", e))?;
        u64::try_from(n).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT product_code, product_name, available_quantity, price
            FROM inventory
            ORDER BY product_code ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory", e))?;

        rows.iter().map(inventory_from_row).collect()
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Map SQLx errors to `StoreError` (see module docs for the table).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
