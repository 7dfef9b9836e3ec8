use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use monitor_core::{ChannelMessage, MonitorError, MonitorResult, SubscriptionClient};
use monitor_infrastructure::MonitorMetrics;

/// 已注册频道对应的处理器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    HeartbeatBatch,
    JobRemoved,
}

/// 消息路由目标，由控制循环在每个周期内提供
#[async_trait]
pub trait MessageRouter: Send {
    async fn route(&mut self, kind: ChannelKind, message: ChannelMessage) -> MonitorResult<()>;
}

/// 一次排空的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub per_channel: Vec<(String, usize)>,
    pub total: usize,
}

impl DrainStats {
    pub fn for_channel(&self, channel: &str) -> usize {
        self.per_channel
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

pub struct MessageDispatcher {
    subscriptions: Vec<Box<dyn SubscriptionClient>>,
    routes: HashMap<String, ChannelKind>,
    max_per_channel: usize,
    metrics: MonitorMetrics,
}

impl MessageDispatcher {
    pub fn new(max_per_channel: usize, metrics: MonitorMetrics) -> Self {
        Self {
            subscriptions: Vec::new(),
            routes: HashMap::new(),
            max_per_channel,
            metrics,
        }
    }

    /// 注册一个频道订阅及其处理器
    pub fn subscribe(&mut self, kind: ChannelKind, client: Box<dyn SubscriptionClient>) {
        self.routes.insert(client.channel().to_string(), kind);
        self.subscriptions.push(client);
    }

    pub fn channels(&self) -> Vec<&str> {
        self.subscriptions.iter().map(|s| s.channel()).collect()
    }

    pub fn max_per_channel(&self) -> usize {
        self.max_per_channel
    }

    /// 依次排空每个订阅，每个频道最多处理 `max_per_channel` 条消息
    ///
    /// 频道暂无消息时立即转向下一个频道；收到未注册频道的消息视为协议错误。
    pub async fn drain(&mut self, router: &mut dyn MessageRouter) -> MonitorResult<DrainStats> {
        let mut stats = DrainStats::default();

        for subscription in self.subscriptions.iter_mut() {
            let mut processed = 0;
            while processed < self.max_per_channel {
                let Some(message) = subscription.poll_message().await? else {
                    break;
                };

                let kind = self.routes.get(&message.channel).copied().ok_or_else(|| {
                    MonitorError::UnknownChannel {
                        channel: message.channel.clone(),
                    }
                })?;

                self.metrics.record_message_dispatched(&message.channel);
                router.route(kind, message).await?;
                processed += 1;
            }

            if processed > 0 {
                debug!("频道 {} 本周期处理了 {} 条消息", subscription.channel(), processed);
            }
            stats
                .per_channel
                .push((subscription.channel().to_string(), processed));
            stats.total += processed;
        }

        Ok(stats)
    }
}
