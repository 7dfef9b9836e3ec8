//! 负载上报型自动伸缩器
//!
//! 读取伸缩配置，根据负载视图记录集群利用率和空闲节点，不负责拉起或终止节点。

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use monitor_core::{Autoscaler, LoadMetrics, MonitorResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalingConfig {
    pub cluster_name: String,
    pub min_workers: u32,
    pub max_workers: u32,
    pub target_utilization_fraction: f64,
    pub idle_timeout_minutes: u64,
}

impl Default for AutoscalingConfig {
    fn default() -> Self {
        Self {
            cluster_name: "default".to_string(),
            min_workers: 0,
            max_workers: 2,
            target_utilization_fraction: 0.8,
            idle_timeout_minutes: 5,
        }
    }
}

impl AutoscalingConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取自动伸缩配置失败: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AutoscalingConfig =
            toml::from_str(content).context("解析自动伸缩配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.is_empty() {
            return Err(anyhow::anyhow!("集群名称不能为空"));
        }
        if self.min_workers > self.max_workers {
            return Err(anyhow::anyhow!(
                "最小节点数 {} 不能大于最大节点数 {}",
                self.min_workers,
                self.max_workers
            ));
        }
        if !(self.target_utilization_fraction > 0.0 && self.target_utilization_fraction <= 1.0) {
            return Err(anyhow::anyhow!(
                "目标利用率必须在 (0, 1] 范围内: {}",
                self.target_utilization_fraction
            ));
        }
        Ok(())
    }
}

pub struct LoadReportingAutoscaler {
    config: AutoscalingConfig,
    updates: u64,
}

impl LoadReportingAutoscaler {
    pub fn new(config: AutoscalingConfig) -> Self {
        info!(
            "Autoscaler for cluster {} configured with {}..{} workers",
            config.cluster_name, config.min_workers, config.max_workers
        );
        Self { config, updates: 0 }
    }

    pub fn config(&self) -> &AutoscalingConfig {
        &self.config
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// 按目标利用率估算所需节点数，限制在配置范围内
    pub fn target_workers(&self, load_metrics: &LoadMetrics) -> u32 {
        let usage = load_metrics.resource_usage();
        let busy = usage.max_utilization() * usage.num_nodes as f64;
        let wanted = (busy / self.config.target_utilization_fraction).ceil() as u32;
        wanted.clamp(self.config.min_workers, self.config.max_workers)
    }
}

#[async_trait]
impl Autoscaler for LoadReportingAutoscaler {
    async fn update(&mut self, load_metrics: &LoadMetrics) -> MonitorResult<()> {
        self.updates += 1;

        let usage = load_metrics.resource_usage();
        let utilization = usage.max_utilization();
        let target = self.target_workers(load_metrics);
        debug!(
            "Cluster {}: {} (utilization {:.2}, target workers {})",
            self.config.cluster_name,
            load_metrics.summary(),
            utilization,
            target
        );

        let idle_timeout = chrono::Duration::minutes(self.config.idle_timeout_minutes as i64);
        let idle = load_metrics.idle_addresses(idle_timeout, Utc::now());
        if !idle.is_empty() {
            info!(
                "{} node(s) idle for more than {} minute(s): {:?}",
                idle.len(),
                self.config.idle_timeout_minutes,
                idle
            );
        }

        if usage.num_nodes > self.config.max_workers as usize {
            warn!(
                "Cluster {} has {} nodes connected, above max_workers {}",
                self.config.cluster_name, usage.num_nodes, self.config.max_workers
            );
        }
        Ok(())
    }

    async fn kill_workers(&mut self) -> MonitorResult<()> {
        info!(
            "Autoscaler for cluster {} manages no workers, nothing to terminate",
            self.config.cluster_name
        );
        Ok(())
    }
}
