use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because frames hop from the localization thread to tokio tasks.
/// Slow subscribers lag and skip ahead rather than holding up the publisher.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes `msg`, returning how many subscribers will see it.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}
