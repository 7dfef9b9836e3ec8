use serde::{Deserialize, Serialize};

/// 控制循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 两次周期之间的休眠时间（毫秒）
    pub heartbeat_interval_ms: u64,
    /// 每个周期每个频道最多处理的消息数
    pub max_messages_per_channel: usize,
    pub heartbeat_batch_channel: String,
    pub job_channel: String,
    pub error_channel: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 100,
            max_messages_per_channel: 10000,
            heartbeat_batch_channel: "HEARTBEAT_BATCH".to_string(),
            job_channel: "JOB".to_string(),
            error_channel: "ERROR_INFO".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(anyhow::anyhow!("心跳周期必须大于0"));
        }

        if self.max_messages_per_channel == 0 {
            return Err(anyhow::anyhow!("每频道最大消息数必须大于0"));
        }

        let channels = [
            &self.heartbeat_batch_channel,
            &self.job_channel,
            &self.error_channel,
        ];
        if channels.iter().any(|c| c.is_empty()) {
            return Err(anyhow::anyhow!("频道名称不能为空"));
        }
        if self.heartbeat_batch_channel == self.job_channel
            || self.heartbeat_batch_channel == self.error_channel
            || self.job_channel == self.error_channel
        {
            return Err(anyhow::anyhow!("频道名称不能重复"));
        }

        Ok(())
    }
}

/// GCS 刷新配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsFlushConfig {
    /// 实验性功能开关
    pub enabled: bool,
    /// 主分片上保存序列化策略的键
    pub policy_key: String,
}

impl Default for GcsFlushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            policy_key: "gcs_flushing_policy".to_string(),
        }
    }
}

impl GcsFlushConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enabled && self.policy_key.is_empty() {
            return Err(anyhow::anyhow!("启用GCS刷新时策略键不能为空"));
        }
        Ok(())
    }
}

/// 自动扩缩容配置来源；未配置路径时整个进程生命周期内不启用自动扩缩容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalerSettings {
    pub config_path: Option<String>,
}

impl AutoscalerSettings {
    pub fn is_enabled(&self) -> bool {
        self.config_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}
