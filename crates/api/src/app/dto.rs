use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{Entity, Money, OrderId};
use orderflow_infra::CreateOrder;
use orderflow_inventory::InventoryRecord;
use orderflow_orders::{Order, OrderItem, OrderStatus};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub total_amount: Money,
}

impl From<CreateOrderRequest> for CreateOrder {
    fn from(body: CreateOrderRequest) -> Self {
        CreateOrder {
            customer_id: body.customer_id,
            items: body
                .items
                .into_iter()
                .map(|i| OrderItem::new(i.product_code, i.quantity, i.price))
                .collect(),
            total_amount: body.total_amount,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub customer_id: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub discount: Money,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: *order.id(),
            customer_id: order.customer_id().to_string(),
            items: order
                .items()
                .iter()
                .map(|i| OrderItemResponse {
                    product_code: i.product_code.clone(),
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
            total_amount: order.total_amount(),
            status: order.status(),
            created_at: order.created_at(),
            processed_at: order.processed_at(),
            discount: order.discount(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub product_code: String,
    pub product_name: String,
    pub available_quantity: i64,
    pub price: Money,
}

impl From<InventoryRecord> for InventoryResponse {
    fn from(r: InventoryRecord) -> Self {
        Self {
            product_code: r.product_code,
            product_name: r.product_name,
            available_quantity: r.available_quantity,
            price: r.price,
        }
    }
}
