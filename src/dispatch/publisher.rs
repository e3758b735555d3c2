//! Message Publishers
//!
//! The engine hands step work to downstream subsystems by publishing one
//! message per step to a named topic. [`MessagePublisher`] is that seam;
//! the transport behind it decides delivery guarantees.
//!
//! Implementations provided here:
//! - [`MemoryPublisher`]: records messages in memory (tests, dry runs)
//! - [`ChannelPublisher`]: bounded in-process bus over `tokio::sync::mpsc`
//! - [`OutboxPublisher`]: appends JSON lines to one file per topic

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::PublishError;

/// A message addressed to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Value,
}

/// One-way, topic-based message publisher.
///
/// Implementations must be safe to share between concurrently running
/// workflow instances. `publish` returning `Ok` means the transport
/// accepted the message, not that any consumer processed it.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes a payload to a topic.
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError>;
}

/// Publisher that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all messages published so far, in order.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    /// Returns the messages published to one topic.
    pub fn messages_for(&self, topic: &str) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl MessagePublisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        self.messages.lock().push(OutboundMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Publisher backed by a bounded tokio channel.
///
/// When the channel is full, `publish` waits for capacity; this is the
/// point where a slow consumer applies backpressure to the engine.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<OutboundMessage>,
}

impl ChannelPublisher {
    /// Creates a publisher and the receiver its messages arrive on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessagePublisher for ChannelPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        self.sender
            .send(OutboundMessage {
                topic: topic.to_string(),
                payload,
            })
            .await
            .map_err(|_| PublishError::Closed)
    }
}

/// Publisher that appends each message as a JSON line to
/// `<dir>/<topic>.jsonl`.
#[derive(Debug)]
pub struct OutboxPublisher {
    dir: PathBuf,
    // Serializes appends so concurrent instances never interleave lines
    write_lock: tokio::sync::Mutex<()>,
}

impl OutboxPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a topic's messages are appended to.
    pub fn topic_path(&self, topic: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", topic))
    }
}

#[async_trait]
impl MessagePublisher for OutboxPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        let mut line = serde_json::to_string(&payload)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.topic_path(topic);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended message to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_publisher_records_in_order() {
        let publisher = MemoryPublisher::new();
        publisher.publish("a", json!({"n": 1})).await.unwrap();
        publisher.publish("b", json!({"n": 2})).await.unwrap();
        publisher.publish("a", json!({"n": 3})).await.unwrap();

        assert_eq!(publisher.len(), 3);
        assert_eq!(publisher.messages()[1].topic, "b");

        let on_a = publisher.messages_for("a");
        assert_eq!(on_a.len(), 2);
        assert_eq!(on_a[1].payload["n"], 3);

        publisher.clear();
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_channel_publisher_delivers() {
        let (publisher, mut receiver) = ChannelPublisher::new(4);
        publisher.publish("notifications", json!({"message": "hi"})).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.topic, "notifications");
        assert_eq!(received.payload["message"], "hi");
    }

    #[tokio::test]
    async fn test_channel_publisher_waits_when_full() {
        use std::time::Duration;
        use tokio::time::timeout;

        let (publisher, mut receiver) = ChannelPublisher::new(1);
        publisher.publish("a", json!({"n": 1})).await.unwrap();

        // No capacity left: the second publish must wait for the consumer
        let blocked = timeout(Duration::from_millis(50), publisher.publish("a", json!({"n": 2}))).await;
        assert!(blocked.is_err());

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.payload, json!({"n": 1}));

        timeout(Duration::from_secs(1), publisher.publish("a", json!({"n": 3})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receiver.recv().await.unwrap().payload, json!({"n": 3}));
    }

    #[tokio::test]
    async fn test_channel_publisher_closed() {
        let (publisher, receiver) = ChannelPublisher::new(1);
        drop(receiver);

        let result = publisher.publish("notifications", json!({})).await;
        assert!(matches!(result, Err(PublishError::Closed)));
    }

    #[tokio::test]
    async fn test_outbox_publisher_appends_lines() {
        use tempfile::tempdir;

        let temp_dir = tempdir().unwrap();
        let publisher = OutboxPublisher::new(temp_dir.path().join("outbox"));

        publisher.publish("service-calls", json!({"service": "a"})).await.unwrap();
        publisher.publish("service-calls", json!({"service": "b"})).await.unwrap();
        publisher.publish("notifications", json!({"message": "c"})).await.unwrap();

        let content = std::fs::read_to_string(publisher.topic_path("service-calls")).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["service"], "a");
        assert_eq!(lines[1]["service"], "b");
        assert!(publisher.topic_path("notifications").exists());
    }

    #[tokio::test]
    async fn test_outbox_publisher_unwritable_dir() {
        use tempfile::tempdir;

        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let publisher = OutboxPublisher::new(&blocker);
        let result = publisher.publish("notifications", json!({})).await;
        assert!(matches!(result, Err(PublishError::Io(_))));
    }
}
