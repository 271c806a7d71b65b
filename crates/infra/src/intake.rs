//! Order intake: record a new order and schedule it for fulfillment.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};

use orderflow_core::{DomainError, Entity, Money, OrderId};
use orderflow_events::{MessageQueue, QueueError};
use orderflow_observability::metrics::{MetricsSink, counters};
use orderflow_orders::{NewOrder, OrderItem, OrderStatus};

use crate::store::{OrderStore, StoreError};

pub const RECEIPT_MESSAGE: &str = "Order received and queued for processing";

/// A submission as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrder {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
}

/// What the caller gets back once the order is stored and queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub customer_id: String,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// The request itself is malformed; nothing was stored.
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("failed to store order: {0}")]
    Store(#[from] StoreError),

    /// The order was stored (and stays PENDING) but could not be queued.
    #[error("order {order_id} stored but not queued: {source}")]
    Publish {
        order_id: OrderId,
        #[source]
        source: QueueError,
    },
}

/// Synchronous submission path.
///
/// Returns only after the order is persisted and its id published (or with an
/// error). Inventory is not consulted here.
pub struct OrderIntake {
    orders: Arc<dyn OrderStore>,
    queue: Arc<dyn MessageQueue>,
    metrics: Arc<dyn MetricsSink>,
}

impl OrderIntake {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        queue: Arc<dyn MessageQueue>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            orders,
            queue,
            metrics,
        }
    }

    #[instrument(skip(self, request), fields(customer_id = %request.customer_id), err)]
    pub async fn create_order(&self, request: CreateOrder) -> Result<OrderReceipt, IntakeError> {
        let new_order = NewOrder::new(
            request.customer_id,
            request.items,
            request.total_amount,
            Utc::now(),
        )?;

        let order = self.orders.insert(new_order).await?;
        let order_id = *order.id();

        if let Err(source) = self.queue.publish(order_id.to_string()).await {
            error!(order_id = %order_id, error = %source, "failed to queue order; left PENDING");
            return Err(IntakeError::Publish { order_id, source });
        }

        self.metrics.increment(counters::ORDERS_RECEIVED);
        info!(order_id = %order_id, total_amount = %order.total_amount(), "order received");

        Ok(OrderReceipt {
            order_id,
            customer_id: order.customer_id().to_string(),
            total_amount: order.total_amount(),
            status: order.status(),
            created_at: order.created_at(),
            message: RECEIPT_MESSAGE.to_string(),
        })
    }
}
