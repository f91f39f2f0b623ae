use crate::transport::{Delivery, DeliverySink, Transport};
use async_trait::async_trait;
use hivemind_core::HivemindResult;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

struct Subscriber {
    channels: HashSet<String>,
    sink: DeliverySink,
}

/// In-process [`Transport`] backed by a hash map and an mpsc fan-out.
///
/// Serves tests and single-process deployments; a Redis- or NATS-backed
/// transport is a drop-in replacement behind the same trait. TTL expiry is
/// lazy (checked on read/enumeration), which is indistinguishable from
/// eager expiry through the trait surface. Uses `tokio::time::Instant`, so
/// paused-clock tests see expiry advance with the test clock.
#[derive(Default)]
pub struct MemoryTransport {
    entries: Mutex<HashMap<String, Entry>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn ping(&self) -> HivemindResult<()> {
        Ok(())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> HivemindResult<()> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> HivemindResult<Option<Vec<u8>>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> HivemindResult<bool> {
        let mut entries = self.entries.lock();
        match entries.remove(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn keys(&self, prefix: &str) -> HivemindResult<Vec<String>> {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired());
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> HivemindResult<()> {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sub| {
            if !sub.channels.contains(channel) {
                return !sub.sink.is_closed();
            }
            sub.sink
                .send(Delivery {
                    channel: channel.to_string(),
                    payload: payload.clone(),
                })
                .is_ok()
        });
        Ok(())
    }

    async fn subscribe(&self, channels: &[String], sink: DeliverySink) -> HivemindResult<()> {
        self.subscribers.lock().push(Subscriber {
            channels: channels.iter().cloned().collect(),
            sink,
        });
        Ok(())
    }
}
