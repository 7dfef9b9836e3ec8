use std::pin::pin;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use redis::aio::PubSub;
use redis::Client;
use tracing::debug;

use monitor_core::config::RedisConfig;
use monitor_core::{ChannelMessage, MonitorError, MonitorResult, SubscriptionClient};

/// 主分片上单个频道的订阅连接
pub struct RedisSubscriber {
    channel: String,
    pubsub: PubSub,
}

impl RedisSubscriber {
    pub async fn subscribe(config: &RedisConfig, channel: &str) -> MonitorResult<Self> {
        let client = Client::open(config.build_url()).map_err(|e| {
            MonitorError::Store(format!("Failed to create Redis client: {e}"))
        })?;
        let mut pubsub = client.get_async_pubsub().await.map_err(|e| {
            MonitorError::Store(format!("Failed to open pub/sub connection: {e}"))
        })?;
        pubsub.subscribe(channel).await.map_err(|e| {
            MonitorError::Store(format!("Failed to subscribe to channel {channel}: {e}"))
        })?;

        debug!("Subscribed to channel {} on {}", channel, config.address);
        Ok(Self {
            channel: channel.to_string(),
            pubsub,
        })
    }
}

#[async_trait]
impl SubscriptionClient for RedisSubscriber {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn poll_message(&mut self) -> MonitorResult<Option<ChannelMessage>> {
        let mut messages = pin!(self.pubsub.on_message());
        match messages.next().now_or_never() {
            None => Ok(None),
            Some(None) => Err(MonitorError::Store(format!(
                "Subscription to channel {} was closed",
                self.channel
            ))),
            Some(Some(msg)) => Ok(Some(ChannelMessage::new(
                msg.get_channel_name(),
                msg.get_payload_bytes().to_vec(),
            ))),
        }
    }
}
