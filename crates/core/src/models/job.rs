use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// 作业表条目，作业移除频道的通知载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTableData {
    pub job_id: JobId,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub node_manager_address: String,
    #[serde(default)]
    pub driver_pid: i64,
}
