use std::sync::Arc;

use async_trait::async_trait;

/// What the worker should do with a delivery after `consume` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled (successfully or as a terminal no-op); acknowledge it.
    Done,
    /// Not handled and nothing was recorded about it; leave it unacknowledged
    /// so an at-least-once transport delivers it again.
    Retry,
}

impl Disposition {
    pub fn should_ack(self) -> bool {
        matches!(self, Disposition::Done)
    }
}

/// Handles one delivered message payload.
///
/// This is the contract a queue worker drives. Implementations never return
/// errors: failures are logged (and counted) inside `consume`, and the
/// returned [`Disposition`] tells the worker whether to acknowledge.
///
/// Delivery can be at-least-once, so implementations must be idempotent.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    async fn consume(&self, payload: &str) -> Disposition;
}

#[async_trait]
impl<C> MessageConsumer for Arc<C>
where
    C: MessageConsumer + ?Sized,
{
    async fn consume(&self, payload: &str) -> Disposition {
        (**self).consume(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_is_acknowledged() {
        assert!(Disposition::Done.should_ack());
        assert!(!Disposition::Retry.should_ack());
    }
}
