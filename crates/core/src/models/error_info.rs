use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// 监控进程退出时推送给所有 driver 的错误类型
pub const MONITOR_DIED_ERROR: &str = "monitor_died";

/// 错误表条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorTableData {
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub error_type: String,
    pub error_message: String,
    pub timestamp: f64,
}

impl ErrorTableData {
    /// 不针对具体作业、广播给所有 driver 的错误
    pub fn broadcast(error_type: &str, error_message: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            job_id: JobId::nil(),
            error_type: error_type.to_string(),
            error_message,
            timestamp: now.timestamp_millis() as f64 / 1000.0,
        }
    }
}
