pub mod fulfillment_worker;

pub use fulfillment_worker::{FulfillmentWorker, FulfillmentWorkerConfig, WorkerHandle};
