use async_trait::async_trait;
use hivemind_core::HivemindResult;
use std::time::Duration;
use tokio::sync::mpsc;

/// One message received from a subscribed channel.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Raw wire bytes.
    pub payload: Vec<u8>,
}

/// Where a transport pushes deliveries for one subscriber.
pub type DeliverySink = mpsc::UnboundedSender<Delivery>;

/// Contract for the durable shared store the swarm communicates through.
///
/// Implementations provide key/value storage with optional TTL expiry, a
/// publish/subscribe channel primitive, and key enumeration by prefix.
/// Guarantees are intentionally weak: delivery is at-least-once per current
/// subscriber, there is no ordering across channels, no replay after a
/// disconnect, and no exactly-once semantics — the broker is built to
/// tolerate their absence. Two concurrent writers to the same key must not
/// corrupt either value.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Verifies connectivity. A failure here is fatal to the caller.
    async fn ping(&self) -> HivemindResult<()>;

    /// Writes a value, overwriting any previous one. With a TTL the key
    /// expires once the duration elapses.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> HivemindResult<()>;

    /// Reads a value. Expired keys read as absent.
    async fn get(&self, key: &str) -> HivemindResult<Option<Vec<u8>>>;

    /// Deletes a key. Returns whether a live value was present. Deleting an
    /// absent key is a no-op, not an error.
    async fn delete(&self, key: &str) -> HivemindResult<bool>;

    /// Enumerates live keys starting with `prefix`.
    async fn keys(&self, prefix: &str) -> HivemindResult<Vec<String>>;

    /// Publishes a payload to a named channel. Fire-and-forget: succeeds
    /// even with zero subscribers.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> HivemindResult<()>;

    /// Subscribes `sink` to the given channels. Every future publish on any
    /// of them is pushed into the sink until the receiving half is dropped.
    async fn subscribe(&self, channels: &[String], sink: DeliverySink) -> HivemindResult<()>;
}
