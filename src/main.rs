use anyhow::{Context, Result};
use clap::{Arg, Command};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cluster_monitor::{publish_fatal_error, MonitorApp};
use monitor_core::config::{AppConfig, ObservabilityConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("monitor")
        .version("1.0.0")
        .about("集群存活监控进程")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("redis-address")
                .long("redis-address")
                .value_name("HOST:PORT")
                .help("主分片地址"),
        )
        .arg(
            Arg::new("redis-password")
                .long("redis-password")
                .value_name("PASSWORD")
                .help("存储认证密码"),
        )
        .arg(
            Arg::new("autoscaling-config")
                .long("autoscaling-config")
                .value_name("FILE")
                .help("自动伸缩配置文件路径"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let mut config = AppConfig::load(config_path.map(String::as_str))
        .with_context(|| format!("加载配置失败: {config_path:?}"))?;

    if let Some(address) = matches.get_one::<String>("redis-address") {
        config.redis.address = address.clone();
    }
    if let Some(password) = matches.get_one::<String>("redis-password") {
        config.redis.password = Some(password.clone());
    }
    if let Some(path) = matches.get_one::<String>("autoscaling-config") {
        config.autoscaler.config_path = Some(path.clone());
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format.clone();
    }
    config.validate()?;

    // 初始化日志系统
    init_logging(&config.logging.level, &config.logging.format)?;
    if config.observability.metrics_enabled {
        init_metrics(&config.observability)?;
    }

    info!("启动集群监控进程");
    info!(
        "心跳间隔 {}ms，每频道每周期最多处理 {} 条消息",
        config.monitor.heartbeat_interval_ms, config.monitor.max_messages_per_channel
    );

    let result = match MonitorApp::new(config.clone()).await {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        error!("监控进程异常退出: {e:#}");
        publish_fatal_error(&config, e).await;
    }
    result
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 安装 Prometheus 指标导出器
fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let address: std::net::SocketAddr = config
        .metrics_bind_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {}", config.metrics_bind_address))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    info!("Prometheus metrics exporter listening on {}", address);
    Ok(())
}
