//! Order fulfillment engine.
//!
//! Consumes one order id per delivered message and drives the order through
//! its terminal status:
//!
//! ```text
//! PENDING ──► PROCESSING ──► PROCESSED
//!    │             │
//!    └─────────────┴──────► FAILED
//! ```
//!
//! Every transition is persisted by its own store call. Transitions are
//! applied to a working copy and only adopted once the store accepted them,
//! so after any failure the in-hand order matches what was last persisted and
//! can always be moved to FAILED.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use orderflow_core::{DomainError, Entity, OrderId};
use orderflow_events::{Disposition, MessageConsumer};
use orderflow_inventory::{Availability, check_availability};
use orderflow_observability::metrics::{MetricsSink, counters};
use orderflow_orders::{DiscountPolicy, Order, OrderStatus, reconcile};

use crate::store::{InventoryStore, OrderStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    /// The order could not be read, so nothing was changed.
    #[error("failed to load order {order_id}: {source}")]
    Lookup {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },

    /// Processing failed and the FAILED status could not be persisted either.
    #[error("order {order_id} could not be marked FAILED: {source}")]
    Unrecoverable {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },
}

/// What a single `process_order` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Payload was not an order id, or no such order exists.
    Skipped,
    /// Order was already PROCESSED or FAILED; left untouched.
    AlreadyTerminal(OrderStatus),
    Processed,
    Failed,
}

/// Error raised inside one fulfillment attempt; always converted into FAILED.
#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub struct FulfillmentEngine {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryStore>,
    metrics: Arc<dyn MetricsSink>,
    policy: DiscountPolicy,
}

impl FulfillmentEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        inventory: Arc<dyn InventoryStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            orders,
            inventory,
            metrics,
            policy: DiscountPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DiscountPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process one delivered payload (an order id in decimal form).
    ///
    /// Malformed payloads and unknown ids are logged and skipped. Anything that
    /// goes wrong once the order is loaded ends in FAILED; the only errors
    /// returned are a failed initial read and a failed FAILED write.
    #[instrument(skip(self), fields(order_id = tracing::field::Empty))]
    pub async fn process_order(&self, payload: &str) -> Result<Outcome, FulfillmentError> {
        let order_id: OrderId = match payload.trim().parse() {
            Ok(id) => id,
            Err(e) => {
                error!(payload = %payload, error = %e, "invalid order id received");
                return Ok(Outcome::Skipped);
            }
        };
        tracing::Span::current().record("order_id", order_id.as_i64());

        let mut order = match self.orders.find_by_id(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                error!(order_id = %order_id, "order not found");
                return Ok(Outcome::Skipped);
            }
            Err(source) => return Err(FulfillmentError::Lookup { order_id, source }),
        };

        if order.status().is_terminal() {
            info!(order_id = %order_id, status = %order.status(), "order already finalised; ignoring");
            return Ok(Outcome::AlreadyTerminal(order.status()));
        }

        info!(order_id = %order_id, "processing order");

        match self.fulfil(&mut order).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(order_id = %order_id, status = %order.status(), error = %err, "error processing order");
                self.force_failed(order).await
            }
        }
    }

    async fn fulfil(&self, order: &mut Order) -> Result<Outcome, StepError> {
        let order_id = *order.id();

        if order.status() == OrderStatus::Processing {
            info!(order_id = %order_id, "resuming order left in PROCESSING");
        } else {
            let mut next = order.clone();
            next.start_processing()?;
            self.orders.save(&next).await?;
            *order = next;
        }

        if let Some((product_code, availability)) = self.first_unavailable(order).await? {
            match availability {
                Availability::Insufficient { requested, available } => warn!(
                    order_id = %order_id,
                    product_code = %product_code,
                    requested,
                    available,
                    "insufficient inventory"
                ),
                _ => warn!(order_id = %order_id, product_code = %product_code, "unknown product"),
            }

            let mut next = order.clone();
            next.mark_failed()?;
            self.orders.save(&next).await?;
            *order = next;

            warn!(order_id = %order_id, "order failed due to inventory issues");
            self.metrics.increment(counters::ORDERS_FAILED);
            return Ok(Outcome::Failed);
        }

        let mut next = order.clone();

        let discount = self.policy.discount_for(next.total_amount())?;
        if !discount.is_zero() {
            next.apply_discount(discount)?;
            info!(order_id = %order_id, discount = %discount, "discount applied");
        }

        let check = reconcile(&next)?;
        if !check.is_consistent() {
            warn!(
                order_id = %order_id,
                computed = %check.computed,
                supplied = %check.supplied,
                "total amount mismatch"
            );
        }

        next.mark_processed(Utc::now())?;
        self.orders.save(&next).await?;
        *order = next;

        info!(order_id = %order_id, "order processed");
        self.metrics.increment(counters::ORDERS_PROCESSED);
        Ok(Outcome::Processed)
    }

    /// First line (in order) that cannot be served; stops looking at the first miss.
    async fn first_unavailable(
        &self,
        order: &Order,
    ) -> Result<Option<(String, Availability)>, StoreError> {
        for item in order.items() {
            let record = self.inventory.find_by_product_code(&item.product_code).await?;
            let availability = check_availability(record.as_ref(), item.quantity);
            if !availability.is_available() {
                return Ok(Some((item.product_code.clone(), availability)));
            }
        }
        Ok(None)
    }

    async fn force_failed(&self, mut order: Order) -> Result<Outcome, FulfillmentError> {
        let order_id = *order.id();

        if let Err(e) = order.mark_failed() {
            warn!(order_id = %order_id, error = %e, "order cannot be moved to FAILED");
            return Ok(Outcome::AlreadyTerminal(order.status()));
        }

        match self.orders.save(&order).await {
            Ok(()) => {
                self.metrics.increment(counters::ORDERS_FAILED);
                Ok(Outcome::Failed)
            }
            Err(source) => {
                error!(order_id = %order_id, error = %source, "failed to persist FAILED status");
                Err(FulfillmentError::Unrecoverable { order_id, source })
            }
        }
    }
}

/// Both errors leave the order non-terminal (PENDING or PROCESSING), so the
/// delivery is kept for redelivery instead of being acknowledged.
#[async_trait]
impl MessageConsumer for FulfillmentEngine {
    async fn consume(&self, payload: &str) -> Disposition {
        match self.process_order(payload).await {
            Ok(_) => Disposition::Done,
            Err(e) => {
                error!(payload = %payload, error = %e, "order fulfillment aborted; leaving message for redelivery");
                Disposition::Retry
            }
        }
    }
}
