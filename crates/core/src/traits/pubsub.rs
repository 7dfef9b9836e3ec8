use async_trait::async_trait;

use crate::MonitorResult;

/// 从订阅频道收到的一条消息
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: Vec<u8>,
}

impl ChannelMessage {
    pub fn new(channel: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }
}

/// 单频道订阅客户端
#[async_trait]
pub trait SubscriptionClient: Send {
    /// 订阅的频道名
    fn channel(&self) -> &str;

    /// 非阻塞地取下一条待处理消息；频道当前为空时返回 `None`
    async fn poll_message(&mut self) -> MonitorResult<Option<ChannelMessage>>;
}
