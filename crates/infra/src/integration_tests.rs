//! Integration tests for the full order pipeline.
//!
//! Tests: Intake → OrderStore → Queue → Worker → FulfillmentEngine → OrderStore
//!
//! Verifies:
//! - Orders with enough stock end PROCESSED, with the discount rule applied
//! - Orders with unknown or short lines end FAILED and are counted once
//! - Redelivery of a finished order changes nothing

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use orderflow_core::{Money, OrderId};
    use orderflow_events::{InMemoryQueue, MessageQueue};
    use orderflow_observability::InMemoryMetrics;
    use orderflow_observability::metrics::counters;
    use orderflow_orders::{Order, OrderItem, OrderStatus};

    use crate::fulfillment::FulfillmentEngine;
    use crate::intake::{CreateOrder, OrderIntake};
    use crate::seed::seed_inventory;
    use crate::store::{InMemoryInventoryStore, InMemoryOrderStore, OrderStore};
    use crate::workers::{FulfillmentWorker, FulfillmentWorkerConfig, WorkerHandle};

    struct Pipeline {
        orders: Arc<InMemoryOrderStore>,
        queue: Arc<InMemoryQueue>,
        metrics: Arc<InMemoryMetrics>,
        intake: OrderIntake,
        worker: WorkerHandle,
    }

    async fn setup() -> Pipeline {
        let orders = Arc::new(InMemoryOrderStore::new());
        let inventory = Arc::new(InMemoryInventoryStore::new());
        seed_inventory(&*inventory).await.unwrap();

        let queue = Arc::new(InMemoryQueue::new());
        let metrics = Arc::new(InMemoryMetrics::new());

        let engine = Arc::new(FulfillmentEngine::new(
            orders.clone(),
            inventory.clone(),
            metrics.clone(),
        ));
        let worker = FulfillmentWorker::spawn(
            FulfillmentWorkerConfig::default().with_concurrency(2),
            queue.clone(),
            engine,
        )
        .await
        .unwrap();

        let intake = OrderIntake::new(orders.clone(), queue.clone(), metrics.clone());

        Pipeline {
            orders,
            queue,
            metrics,
            intake,
            worker,
        }
    }

    fn request(customer: &str, items: Vec<OrderItem>, total: Decimal) -> CreateOrder {
        CreateOrder {
            customer_id: customer.to_string(),
            items,
            total_amount: Money::new(total),
        }
    }

    fn line(code: &str, qty: i64, price: Decimal) -> OrderItem {
        OrderItem::new(code, qty, Money::new(price))
    }

    /// Helper: poll until the order reaches a terminal status.
    async fn wait_for_terminal(orders: &InMemoryOrderStore, id: OrderId) -> Order {
        for _ in 0..200 {
            if let Some(order) = orders.find_by_id(id).await.unwrap() {
                if order.status().is_terminal() {
                    return order;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("order {id} did not reach a terminal status in time");
    }

    /// Helper: close the queue and wait for the worker to drain it.
    async fn drain(p: Pipeline) -> (Arc<InMemoryOrderStore>, Arc<InMemoryMetrics>) {
        p.queue.close();
        p.worker.join().await;
        (p.orders, p.metrics)
    }

    #[tokio::test]
    async fn small_order_is_received_then_processed() {
        let p = setup().await;

        let receipt = p
            .intake
            .create_order(request("C1", vec![line("SKU-001", 2, dec!(49.99))], dec!(99.98)))
            .await
            .unwrap();
        assert_eq!(receipt.status, OrderStatus::Pending);

        let order = wait_for_terminal(&p.orders, receipt.order_id).await;
        assert_eq!(order.status(), OrderStatus::Processed);
        assert!(order.discount().is_zero());
        assert!(order.processed_at().is_some());

        let (_, metrics) = drain(p).await;
        assert_eq!(metrics.count(counters::ORDERS_RECEIVED), 1);
        assert_eq!(metrics.count(counters::ORDERS_PROCESSED), 1);
        assert_eq!(metrics.count(counters::ORDERS_FAILED), 0);
    }

    #[tokio::test]
    async fn large_order_is_discounted() {
        let p = setup().await;

        let receipt = p
            .intake
            .create_order(request("C2", vec![line("SKU-001", 5, dec!(49.99))], dec!(249.95)))
            .await
            .unwrap();

        let order = wait_for_terminal(&p.orders, receipt.order_id).await;
        assert_eq!(order.status(), OrderStatus::Processed);
        assert_eq!(order.discount().amount(), dec!(24.995));
        assert_eq!(order.total_amount().amount(), dec!(249.95));
        drain(p).await;
    }

    #[tokio::test]
    async fn unknown_product_fails_and_is_counted_once() {
        let p = setup().await;

        let receipt = p
            .intake
            .create_order(request("C3", vec![line("UNKNOWN-SKU", 1, dec!(10.00))], dec!(10.00)))
            .await
            .unwrap();

        let order = wait_for_terminal(&p.orders, receipt.order_id).await;
        assert_eq!(order.status(), OrderStatus::Failed);

        let (_, metrics) = drain(p).await;
        assert_eq!(metrics.count(counters::ORDERS_FAILED), 1);
        assert_eq!(metrics.count(counters::ORDERS_PROCESSED), 0);
    }

    #[tokio::test]
    async fn mismatched_total_is_still_processed() {
        let p = setup().await;

        let receipt = p
            .intake
            .create_order(request("C4", vec![line("PROD-001", 1, dec!(50.00))], dec!(999.00)))
            .await
            .unwrap();

        let order = wait_for_terminal(&p.orders, receipt.order_id).await;
        assert_eq!(order.status(), OrderStatus::Processed);
        assert_eq!(order.total_amount().amount(), dec!(999.00));
        drain(p).await;
    }

    #[tokio::test]
    async fn redelivered_and_bogus_messages_change_nothing() {
        let p = setup().await;

        let receipt = p
            .intake
            .create_order(request("C5", vec![line("SKU-002", 3, dec!(19.50))], dec!(58.50)))
            .await
            .unwrap();
        let first = wait_for_terminal(&p.orders, receipt.order_id).await;

        p.queue.publish(receipt.order_id.to_string()).await.unwrap();
        p.queue.publish("not-a-number".to_string()).await.unwrap();
        p.queue.publish("999999".to_string()).await.unwrap();

        let (orders, metrics) = drain(p).await;
        let again = orders.find_by_id(receipt.order_id).await.unwrap().unwrap();
        assert_eq!(again, first);
        assert_eq!(metrics.count(counters::ORDERS_PROCESSED), 1);
        assert_eq!(metrics.count(counters::ORDERS_FAILED), 0);
    }

    #[tokio::test]
    async fn mixed_batch_settles_every_order() {
        let p = setup().await;

        let mut expected = Vec::new();
        for i in 0..10 {
            let (items, total, status) = if i % 3 == 0 {
                (vec![line("PROD-002", 100, dec!(30.00))], dec!(3000.00), OrderStatus::Failed)
            } else {
                (vec![line("PROD-002", 1, dec!(30.00))], dec!(30.00), OrderStatus::Processed)
            };
            let receipt = p
                .intake
                .create_order(request(&format!("C{i}"), items, total))
                .await
                .unwrap();
            expected.push((receipt.order_id, status));
        }

        let (orders, metrics) = drain(p).await;

        for (id, status) in expected {
            assert_eq!(orders.find_by_id(id).await.unwrap().unwrap().status(), status);
        }
        assert_eq!(metrics.count(counters::ORDERS_RECEIVED), 10);
        assert_eq!(metrics.count(counters::ORDERS_FAILED), 4);
        assert_eq!(metrics.count(counters::ORDERS_PROCESSED), 6);
    }
}
