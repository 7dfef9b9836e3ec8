use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{
    monitor::{AutoscalerSettings, GcsFlushConfig, MonitorConfig},
    observability::{LoggingConfig, ObservabilityConfig},
    redis::RedisConfig,
};

/// 旧版能力开关：只要设置了该环境变量就启用 GCS 刷新
pub const LEGACY_FLUSH_FLAG: &str = "RAY_USE_NEW_GCS";

/// Monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub monitor: MonitorConfig,
    pub gcs_flush: GcsFlushConfig,
    pub autoscaler: AutoscalerSettings,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: MONITOR__, separator: __)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/monitor.toml",
                "monitor.toml",
                "/etc/monitor/config.toml",
            ];
            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("MONITOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        if std::env::var_os(LEGACY_FLUSH_FLAG).is_some() {
            config.gcs_flush.enabled = true;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.heartbeat_interval_ms)
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.redis.validate().context("Redis配置验证失败")?;
        self.monitor.validate().context("监控循环配置验证失败")?;
        self.gcs_flush.validate().context("GCS刷新配置验证失败")?;
        self.logging.validate().context("日志配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        Ok(())
    }
}
