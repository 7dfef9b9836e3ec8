use thiserror::Error;

/// 监控进程错误类型定义
///
/// 到达控制循环的错误一律视为致命错误；部分成功（删除数量不足、心跳节点无法解析）
/// 只记录日志，不会构造成错误。
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("存储错误: {0}")]
    Store(String),

    #[error("分片 {shard} 不可用: {message}")]
    ShardUnavailable { shard: usize, message: String },

    #[error("消息解码错误: {0}")]
    Decode(String),

    #[error("协议错误: 收到未注册频道 {channel} 的消息")]
    UnknownChannel { channel: String },

    #[error("无效的标识符: {0}")]
    InvalidId(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("自动扩缩容错误: {0}")]
    Autoscaler(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl MonitorError {
    /// 协议违例：未知频道或无法解码的通知
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            MonitorError::UnknownChannel { .. } | MonitorError::Decode(_)
        )
    }

    /// 基础设施瞬时错误：存储不可达、超时
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MonitorError::Store(_) | MonitorError::ShardUnavailable { .. }
        )
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        MonitorError::Serialization(e.to_string())
    }
}

/// 统一的Result类型
pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
