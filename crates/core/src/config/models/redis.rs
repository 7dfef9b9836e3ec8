use serde::{Deserialize, Serialize};

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// 主分片地址 `host:port`
    pub address: String,
    pub password: Option<String>,
    pub connection_timeout_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: None,
            connection_timeout_seconds: 30,
        }
    }
}

impl RedisConfig {
    /// Validate Redis configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let (host, port) = self
            .address
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("Redis地址必须为 host:port 格式: {}", self.address))?;

        if host.is_empty() {
            return Err(anyhow::anyhow!("Redis主机地址不能为空"));
        }

        match port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(anyhow::anyhow!("Redis端口无效: {}", port));
            }
            Ok(_) => {}
        }

        if self.connection_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Redis连接超时时间必须大于0"));
        }

        Ok(())
    }

    /// Build the connection URL of the primary shard
    pub fn build_url(&self) -> String {
        self.build_url_for(&self.address)
    }

    /// Build a connection URL for any shard address, reusing the configured password
    pub fn build_url_for(&self, address: &str) -> String {
        let auth = if let Some(password) = &self.password {
            format!(":{password}@")
        } else {
            String::new()
        };
        format!("redis://{auth}{address}/")
    }

    /// Check if password is configured
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}
