//! Topic-based change feed.
//!
//! One Tokio broadcast channel per topic. Every message is a complete JSON
//! snapshot envelope, so a listener replaces its local copy on each receive.
//! Dropping the receiver is the unsubscribe; empty topics are pruned on the
//! next broadcast.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

type Topic = String;
type Sender = broadcast::Sender<String>;
type Receiver = broadcast::Receiver<String>;

#[derive(Clone)]
pub struct FeedManager {
    inner: Arc<RwLock<HashMap<Topic, Sender>>>,
    capacity: usize,
}

impl Default for FeedManager {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

impl FeedManager {
    /// Creates a feed sized from `FEED_CAPACITY`.
    pub fn new() -> Self {
        Self::with_capacity(crate::config::feed_capacity())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to the given topic, creating it if necessary.
    pub async fn subscribe(&self, topic: &str) -> Receiver {
        let mut map = self.inner.write().await;
        map.entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Broadcasts a message to all subscribers of `topic`.
    ///
    /// No-op for unknown topics. A topic left with zero receivers is removed.
    pub async fn broadcast<T: Into<String>>(&self, topic: &str, msg: T) {
        let mut map = self.inner.write().await;
        if let Some(sender) = map.get(topic) {
            let _ = sender.send(msg.into());
            if sender.receiver_count() == 0 {
                tracing::debug!("Removing feed topic '{topic}' due to no subscribers.");
                map.remove(topic);
            }
        }
    }

    /// Number of live receivers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let map = self.inner.read().await;
        map.get(topic).map(|s| s.receiver_count()).unwrap_or(0)
    }

    pub async fn has_topic(&self, topic: &str) -> bool {
        self.inner.read().await.contains_key(topic)
    }
}
