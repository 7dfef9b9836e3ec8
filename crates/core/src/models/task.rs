use serde::{Deserialize, Serialize};

use super::ids::{JobId, TaskId};

/// 任务规格中本模块关心的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_id: TaskId,
    pub job_id: JobId,
    #[serde(default)]
    pub function_descriptor: Vec<String>,
}

/// 任务表中存储的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTableData {
    pub task_spec: TaskSpec,
}

/// 任务记录：任务ID及其所属作业
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub job_id: JobId,
}

impl From<TaskTableData> for TaskRecord {
    fn from(data: TaskTableData) -> Self {
        Self {
            task_id: data.task_spec.task_id,
            job_id: data.task_spec.job_id,
        }
    }
}
