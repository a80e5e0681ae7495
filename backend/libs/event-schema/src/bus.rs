use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Pub/sub fabric between the write path and realtime hubs. One channel per
/// recipient, opaque JSON payloads.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError>;

    /// Subscribe to a channel. Messages arrive until the receiver is dropped.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::UnboundedReceiver<String>, BusError>;
}

pub struct RedisBus {
    client: redis::Client,
}

impl RedisBus {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::UnboundedReceiver<String>, BusError> {
        // Pub/sub needs a dedicated connection, not the multiplexed one.
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable bus payload");
                        continue;
                    }
                };
                if tx.send(payload).is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// In-process bus for tests and single-node runs: a channel registry over
/// mpsc senders. Dead subscribers are dropped on the next publish.
#[derive(Default, Clone)]
pub struct LocalBus {
    inner: Arc<RwLock<HashMap<String, Vec<mpsc::UnboundedSender<String>>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventBus for LocalBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(channel) {
            subscribers.retain(|tx| tx.send(payload.to_string()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::UnboundedReceiver<String>, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
