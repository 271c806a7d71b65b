use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use orderflow_events::{InMemoryQueue, MessageQueue, QueueError};
use orderflow_infra::config::{AppConfig, Backend};
use orderflow_infra::seed::seed_inventory;
use orderflow_infra::store::{
    InMemoryInventoryStore, InMemoryOrderStore, InventoryStore, OrderStore, StoreError,
};
use orderflow_infra::workers::{FulfillmentWorker, FulfillmentWorkerConfig, WorkerHandle};
use orderflow_infra::{FulfillmentEngine, OrderIntake};
use orderflow_observability::{MetricsSink, NoopMetrics, RecorderMetrics};

#[cfg(feature = "redis")]
use orderflow_infra::{
    queue::{RedisStreamsError, RedisStreamsQueue},
    store::{PostgresInventoryStore, PostgresOrderStore, ensure_schema},
};
#[cfg(feature = "redis")]
use sqlx::postgres::PgPoolOptions;

#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] RedisStreamsError),
}

/// What the HTTP handlers need.
pub struct AppServices {
    pub orders: Arc<dyn OrderStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub intake: OrderIntake,
    pub prometheus: Option<PrometheusHandle>,
}

/// Running service graph: handler state plus the background worker.
pub struct Runtime {
    pub services: Arc<AppServices>,
    worker: WorkerHandle,
    local_queue: Option<Arc<InMemoryQueue>>,
}

impl Runtime {
    /// Stop the fulfillment worker.
    ///
    /// With the in-memory queue, already queued orders are drained first.
    pub async fn shutdown(self) {
        match self.local_queue {
            Some(queue) => {
                queue.close();
                self.worker.join().await;
            }
            None => self.worker.shutdown().await,
        }
    }
}

/// Build stores, queue, services and the fulfillment worker from config.
///
/// `prometheus` is the handle returned by installing the global recorder;
/// when absent, counters are discarded.
pub async fn build_services(
    config: &AppConfig,
    prometheus: Option<PrometheusHandle>,
) -> Result<Runtime, ServicesError> {
    let metrics: Arc<dyn MetricsSink> = if prometheus.is_some() {
        Arc::new(RecorderMetrics)
    } else {
        Arc::new(NoopMetrics)
    };

    let (orders, inventory, queue, local_queue) = open_backend(config).await?;

    if config.seed_inventory {
        seed_inventory(inventory.as_ref()).await?;
    }

    let engine = Arc::new(FulfillmentEngine::new(
        orders.clone(),
        inventory.clone(),
        metrics.clone(),
    ));
    let worker = FulfillmentWorker::spawn(
        FulfillmentWorkerConfig::default().with_concurrency(config.workers),
        queue.clone(),
        engine,
    )
    .await?;

    let intake = OrderIntake::new(orders.clone(), queue, metrics);

    Ok(Runtime {
        services: Arc::new(AppServices {
            orders,
            inventory,
            intake,
            prometheus,
        }),
        worker,
        local_queue,
    })
}

type Stores = (
    Arc<dyn OrderStore>,
    Arc<dyn InventoryStore>,
    Arc<dyn MessageQueue>,
    Option<Arc<InMemoryQueue>>,
);

async fn open_backend(config: &AppConfig) -> Result<Stores, ServicesError> {
    if let Backend::Persistent {
        database_url,
        redis_url,
    } = &config.backend
    {
        #[cfg(feature = "redis")]
        {
            return connect_persistent(config, database_url, redis_url).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            let _ = (database_url, redis_url);
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    Ok(in_memory())
}

fn in_memory() -> Stores {
    info!("using in-memory stores and queue");
    let local = Arc::new(InMemoryQueue::new());
    let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
    let inventory: Arc<dyn InventoryStore> = Arc::new(InMemoryInventoryStore::new());
    let queue: Arc<dyn MessageQueue> = local.clone();
    (orders, inventory, queue, Some(local))
}

#[cfg(feature = "redis")]
async fn connect_persistent(
    config: &AppConfig,
    database_url: &str,
    redis_url: &str,
) -> Result<Stores, ServicesError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    ensure_schema(&pool).await?;

    let queue = RedisStreamsQueue::new(
        redis_url,
        Some(config.queue_key.clone()),
        Some(config.consumer_group.clone()),
    )?
    .with_redelivery(config.redelivery);
    queue.ensure_consumer_group().await?;

    info!(stream_key = %queue.stream_key(), "using postgres stores and redis streams queue");

    let orders: Arc<dyn OrderStore> = Arc::new(PostgresOrderStore::new(pool.clone()));
    let inventory: Arc<dyn InventoryStore> = Arc::new(PostgresInventoryStore::new(pool));
    let queue: Arc<dyn MessageQueue> = Arc::new(queue);
    Ok((orders, inventory, queue, None))
}
