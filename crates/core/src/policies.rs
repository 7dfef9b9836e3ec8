//! 内置 GCS 刷新策略及其序列化格式

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

use crate::errors::{MonitorError, MonitorResult};
use crate::traits::{CoordinationStore, FlushPolicy};

/// 存储中保存的策略描述，按 `type` 字段区分版本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlushPolicyConfig {
    Simple(SimpleFlushPolicyConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleFlushPolicyConfig {
    #[serde(default = "default_flush_when_at_least_bytes")]
    pub flush_when_at_least_bytes: u64,
    #[serde(default = "default_flush_period_secs")]
    pub flush_period_secs: u64,
    #[serde(default = "default_flush_num_entries_each_time")]
    pub flush_num_entries_each_time: u64,
}

fn default_flush_when_at_least_bytes() -> u64 {
    1 << 31
}

fn default_flush_period_secs() -> u64 {
    10
}

fn default_flush_num_entries_each_time() -> u64 {
    10000
}

impl Default for SimpleFlushPolicyConfig {
    fn default() -> Self {
        Self {
            flush_when_at_least_bytes: default_flush_when_at_least_bytes(),
            flush_period_secs: default_flush_period_secs(),
            flush_num_entries_each_time: default_flush_num_entries_each_time(),
        }
    }
}

impl FlushPolicyConfig {
    pub fn decode(serialized: &[u8]) -> MonitorResult<Self> {
        serde_json::from_slice(serialized)
            .map_err(|e| MonitorError::Decode(format!("invalid GCS flush policy: {e}")))
    }

    pub fn encode(&self) -> MonitorResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn into_policy(self) -> Box<dyn FlushPolicy> {
        match self {
            FlushPolicyConfig::Simple(config) => Box::new(SimpleFlushPolicy::new(config)),
        }
    }
}

/// 周期性刷新策略：距上次刷新超过 `flush_period_secs` 且分片内存达到阈值时刷新
#[derive(Debug)]
pub struct SimpleFlushPolicy {
    config: SimpleFlushPolicyConfig,
    last_flush: Instant,
}

impl SimpleFlushPolicy {
    pub fn new(config: SimpleFlushPolicyConfig) -> Self {
        Self {
            config,
            last_flush: Instant::now(),
        }
    }
}

#[async_trait]
impl FlushPolicy for SimpleFlushPolicy {
    async fn should_flush(&self, store: &dyn CoordinationStore) -> MonitorResult<bool> {
        if self.last_flush.elapsed() < Duration::from_secs(self.config.flush_period_secs) {
            return Ok(false);
        }
        let used_memory = store.used_memory().await?;
        Ok(used_memory >= self.config.flush_when_at_least_bytes)
    }

    fn num_entries_to_flush(&self) -> u64 {
        self.config.flush_num_entries_each_time
    }

    fn record_flush(&mut self) {
        self.last_flush = Instant::now();
    }
}
