pub mod manager;
pub use manager::FeedManager;

use chrono::Utc;
use serde::Serialize;

/// Standard envelope sent over feed topics.
#[derive(Serialize)]
pub struct EventEnvelope<'a, T> {
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub event: &'a str,
    pub topic: &'a str,
    pub payload: T,
    pub ts: String,
}

/// An event knows its stable name and the topic it belongs to.
pub trait Event: Serialize {
    const NAME: &'static str;
    fn topic_path(&self) -> String;
}

/// Broadcast a JSON-serialized `EventEnvelope` on `topic`.
pub async fn emit_raw<T: Serialize>(feed: &FeedManager, topic: &str, event: &str, payload: &T) {
    let env = EventEnvelope {
        r#type: "event",
        event,
        topic,
        payload,
        ts: Utc::now().to_rfc3339(),
    };
    match serde_json::to_string(&env) {
        Ok(json) => feed.broadcast(topic, json).await,
        Err(err) => tracing::error!("Failed to serialize feed event '{event}': {err}"),
    }
}

/// Broadcast `ev` on its own topic path.
pub async fn emit<E: Event>(feed: &FeedManager, ev: &E) {
    let topic = ev.topic_path();
    emit_raw(feed, &topic, E::NAME, ev).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Ping {
        id: i64,
    }

    impl Event for Ping {
        const NAME: &'static str = "test.ping";
        fn topic_path(&self) -> String {
            format!("ping:{}", self.id)
        }
    }

    #[tokio::test]
    async fn emit_wraps_payload_in_envelope() {
        let feed = FeedManager::default();
        let mut rx = feed.subscribe("ping:3").await;

        emit(&feed, &Ping { id: 3 }).await;

        let raw = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["event"], "test.ping");
        assert_eq!(value["topic"], "ping:3");
        assert_eq!(value["payload"]["id"], 3);
    }
}
