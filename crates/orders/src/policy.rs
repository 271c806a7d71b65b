//! Pricing rules applied during fulfillment.

use rust_decimal::Decimal;

use orderflow_core::{DomainResult, Money};

use crate::order::Order;

/// Percentage discount for orders strictly above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountPolicy {
    threshold: Money,
    rate: Decimal,
}

impl Default for DiscountPolicy {
    /// 10% off orders whose total is greater than 100.
    fn default() -> Self {
        Self {
            threshold: Money::new(Decimal::ONE_HUNDRED),
            rate: Decimal::new(10, 2),
        }
    }
}

impl DiscountPolicy {
    pub fn new(threshold: Money, rate: Decimal) -> Self {
        Self { threshold, rate }
    }

    pub fn threshold(&self) -> Money {
        self.threshold
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Discount granted on `total`: `total × rate` when `total > threshold`,
    /// zero otherwise. The product is exact; no rounding is applied.
    pub fn discount_for(&self, total: Money) -> DomainResult<Money> {
        if total > self.threshold {
            total.scaled_by(self.rate)
        } else {
            Ok(Money::ZERO)
        }
    }
}

/// Requester-supplied total compared with the sum of the order lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub computed: Money,
    pub supplied: Money,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.computed.same_amount(&self.supplied)
    }
}

/// Compare an order's computed line total to its supplied total.
///
/// Informational only: callers log a mismatch and carry on.
pub fn reconcile(order: &Order) -> DomainResult<Reconciliation> {
    Ok(Reconciliation {
        computed: order.computed_total()?,
        supplied: order.total_amount(),
    })
}
