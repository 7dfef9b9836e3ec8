use tracing::{debug, info, warn};

use monitor_core::config::GcsFlushConfig;
use monitor_core::policies::FlushPolicyConfig;
use monitor_core::{CoordinationStore, FlushPolicy, MonitorResult};
use monitor_infrastructure::MonitorMetrics;

/// 从存储中的策略描述构造策略对象
pub type PolicyDecoder =
    Box<dyn Fn(&[u8]) -> MonitorResult<Box<dyn FlushPolicy>> + Send + Sync>;

/// GCS 刷新功能状态，只会从左向右推进或直接进入 `Disabled`
pub enum FlushState {
    Disabled,
    PolicyUnset,
    PolicyLoaded(Box<dyn FlushPolicy>),
}

impl FlushState {
    pub fn name(&self) -> &'static str {
        match self {
            FlushState::Disabled => "disabled",
            FlushState::PolicyUnset => "policy_unset",
            FlushState::PolicyLoaded(_) => "policy_loaded",
        }
    }
}

impl std::fmt::Debug for FlushState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 实验性的 GCS 刷新控制器，仅支持单分片部署
pub struct FlushController {
    state: FlushState,
    policy_key: String,
    decoder: PolicyDecoder,
    metrics: MonitorMetrics,
}

impl FlushController {
    /// 创建控制器并探测存储是否支持刷新命令
    ///
    /// 未开启、多分片或探测失败时，功能在整个进程生命周期内保持关闭。
    pub async fn new(
        config: &GcsFlushConfig,
        store: &dyn CoordinationStore,
        metrics: MonitorMetrics,
    ) -> Self {
        let mut controller = Self::disabled(metrics);
        controller.policy_key = config.policy_key.clone();

        if !config.enabled {
            debug!("GCS刷新功能未开启");
            return controller;
        }

        let shard_count = store.shard_count();
        if shard_count != 1 {
            warn!("GCS刷新仅支持单分片部署，当前有 {} 个分片，功能已关闭", shard_count);
            return controller;
        }

        match store.flush_shard(0).await {
            Ok(_) => {
                info!("GCS刷新功能已开启，等待加载刷新策略");
                controller.state = FlushState::PolicyUnset;
            }
            Err(e) => {
                warn!("存储不支持刷新命令，GCS刷新功能已关闭: {}", e);
            }
        }
        controller
    }

    pub fn disabled(metrics: MonitorMetrics) -> Self {
        Self {
            state: FlushState::Disabled,
            policy_key: String::new(),
            decoder: Box::new(decode_builtin_policy),
            metrics,
        }
    }

    /// 替换策略解码方式
    pub fn with_decoder(mut self, decoder: PolicyDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn state(&self) -> &FlushState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, FlushState::Disabled)
    }

    /// 每个周期调用一次，执行了刷新时返回刷新的条目数
    pub async fn maybe_flush(
        &mut self,
        store: &dyn CoordinationStore,
    ) -> MonitorResult<Option<i64>> {
        if let FlushState::PolicyUnset = self.state {
            match store.get(&self.policy_key).await? {
                Some(serialized) => {
                    let policy = (self.decoder)(&serialized)?;
                    info!("已加载GCS刷新策略 {}", self.policy_key);
                    self.state = FlushState::PolicyLoaded(policy);
                }
                None => {
                    info!("未设置GCS刷新策略 {}，刷新功能保持关闭", self.policy_key);
                    self.state = FlushState::Disabled;
                }
            }
        }

        let FlushState::PolicyLoaded(policy) = &mut self.state else {
            return Ok(None);
        };

        if !policy.should_flush(store).await? {
            return Ok(None);
        }

        let max_entries = policy.num_entries_to_flush();
        let num_flushed = store.flush_shard(max_entries).await?;
        info!("GCS刷新完成，刷新了 {} 个条目", num_flushed);

        let removed = store.flush_event_logs().await?;
        debug!("清理了 {} 个事件日志键", removed);

        policy.record_flush();
        self.metrics.record_flush(num_flushed);
        Ok(Some(num_flushed))
    }
}

fn decode_builtin_policy(serialized: &[u8]) -> MonitorResult<Box<dyn FlushPolicy>> {
    Ok(FlushPolicyConfig::decode(serialized)?.into_policy())
}
