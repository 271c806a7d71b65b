use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{DomainError, DomainResult, Entity, Money, OrderId, ValueObject};

use crate::status::OrderStatus;

/// Order line: product code, quantity, unit price.
///
/// Quantity is expected to be non-negative but that is not enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
}

impl ValueObject for OrderItem {}

impl OrderItem {
    pub fn new(product_code: impl Into<String>, quantity: i64, price: Money) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
            price,
        }
    }

    /// `price × quantity`, exact.
    pub fn line_total(&self) -> DomainResult<Money> {
        self.price.times(self.quantity)
    }
}

/// An order that has not been persisted yet (no identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    customer_id: String,
    items: Vec<OrderItem>,
    total_amount: Money,
    created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Build a PENDING order request.
    ///
    /// Only the request shape is checked (customer present, at least one
    /// line). Inventory is not consulted and `total_amount` is taken as given.
    pub fn new(
        customer_id: impl Into<String>,
        items: Vec<OrderItem>,
        total_amount: Money,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let customer_id = customer_id.into();
        if customer_id.trim().is_empty() {
            return Err(DomainError::validation("customer_id cannot be empty"));
        }
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        Ok(Self {
            customer_id,
            items,
            total_amount,
            created_at,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Attach the identity assigned by the store.
    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            items: self.items,
            total_amount: self.total_amount,
            created_at: self.created_at,
            fulfillment: Fulfillment::default(),
        }
    }
}

/// The mutable part of an order: only the fulfillment engine changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub status: OrderStatus,
    pub discount: Money,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Default for Fulfillment {
    fn default() -> Self {
        Self {
            status: OrderStatus::Pending,
            discount: Money::ZERO,
            processed_at: None,
        }
    }
}

/// A persisted order.
///
/// Creation data (customer, items, total, timestamp) is fixed for the life of
/// the order; the `Fulfillment` projection moves forward through
/// `OrderStatus` via the transition methods below. There is no
/// `Deserialize`: orders are only rebuilt from storage through `restore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    customer_id: String,
    items: Vec<OrderItem>,
    total_amount: Money,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    fulfillment: Fulfillment,
}

impl Order {
    /// Rebuild an order from storage.
    pub fn restore(
        id: OrderId,
        customer_id: String,
        items: Vec<OrderItem>,
        total_amount: Money,
        created_at: DateTime<Utc>,
        fulfillment: Fulfillment,
    ) -> Self {
        Self {
            id,
            customer_id,
            items,
            total_amount,
            created_at,
            fulfillment,
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn fulfillment(&self) -> &Fulfillment {
        &self.fulfillment
    }

    pub fn status(&self) -> OrderStatus {
        self.fulfillment.status
    }

    pub fn discount(&self) -> Money {
        self.fulfillment.discount
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.fulfillment.processed_at
    }

    /// Sum of `price × quantity` over all lines.
    pub fn computed_total(&self) -> DomainResult<Money> {
        self.items
            .iter()
            .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.line_total()?))
    }

    /// PENDING → PROCESSING.
    pub fn start_processing(&mut self) -> DomainResult<()> {
        self.transition(OrderStatus::Processing)
    }

    /// Record the discount granted during fulfillment. Only valid while PROCESSING.
    pub fn apply_discount(&mut self, discount: Money) -> DomainResult<()> {
        if self.fulfillment.status != OrderStatus::Processing {
            return Err(DomainError::invariant(format!(
                "discount can only be applied while PROCESSING (order {} is {})",
                self.id, self.fulfillment.status
            )));
        }
        self.fulfillment.discount = discount;
        Ok(())
    }

    /// PROCESSING → PROCESSED, stamping `processed_at`.
    pub fn mark_processed(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Processed)?;
        self.fulfillment.processed_at = Some(at);
        Ok(())
    }

    /// PENDING/PROCESSING → FAILED.
    pub fn mark_failed(&mut self) -> DomainResult<()> {
        self.transition(OrderStatus::Failed)
    }

    fn transition(&mut self, next: OrderStatus) -> DomainResult<()> {
        let current = self.fulfillment.status;
        if !current.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "illegal status transition for order {}: {current} -> {next}",
                self.id
            )));
        }
        self.fulfillment.status = next;
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
