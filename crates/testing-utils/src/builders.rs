//! Test data builders for wire payloads and identifiers

use monitor_core::models::{
    GcsEntry, HeartbeatBatchTableData, HeartbeatTableData, JobId, JobTableData, NodeId,
    NodeTableEntry, ObjectId, TaskId, TaskSpec, TaskTableData,
};
use monitor_core::{route, ShardIndex};

pub fn node_id(seed: u8) -> NodeId {
    NodeId::from([seed; NodeId::SIZE])
}

pub fn job_id(seed: u8) -> JobId {
    JobId::from([seed; JobId::SIZE])
}

/// 找到一个路由到指定分片的任务ID，`nth` 区分同一分片上的多个任务
pub fn task_id_on_shard(shard: ShardIndex, shard_count: usize, nth: usize) -> TaskId {
    let mut found = 0;
    for counter in 0u64.. {
        let mut raw = [0u8; TaskId::SIZE];
        raw[..8].copy_from_slice(&counter.to_le_bytes());
        raw[8..].copy_from_slice(b"taskseed");
        let task_id = TaskId::from(raw);
        if route(task_id.binary(), shard_count) == shard {
            if found == nth {
                return task_id;
            }
            found += 1;
        }
    }
    unreachable!("counter space exhausted")
}

/// 找到任务的一个路由到指定分片的返回对象
pub fn object_id_on_shard(task_id: &TaskId, shard: ShardIndex, shard_count: usize) -> ObjectId {
    (1u32..)
        .map(|index| task_id.object_id(index))
        .find(|object_id| route(object_id.binary(), shard_count) == shard)
        .unwrap()
}

pub fn task_data(task_id: TaskId, job_id: JobId) -> TaskTableData {
    TaskTableData {
        task_spec: TaskSpec {
            task_id,
            job_id,
            function_descriptor: vec!["tests".to_string(), "f".to_string()],
        },
    }
}

/// Builder for heartbeat entries
pub struct HeartbeatBuilder {
    heartbeat: HeartbeatTableData,
}

impl HeartbeatBuilder {
    pub fn new(client_id: NodeId) -> Self {
        Self {
            heartbeat: HeartbeatTableData {
                client_id,
                resources_available_label: Vec::new(),
                resources_available_capacity: Vec::new(),
                resources_total_label: Vec::new(),
                resources_total_capacity: Vec::new(),
            },
        }
    }

    /// 追加一个资源下标，可用量与总量标签相同
    pub fn with_resource(mut self, label: &str, available: f64, total: f64) -> Self {
        self.heartbeat
            .resources_available_label
            .push(label.to_string());
        self.heartbeat.resources_available_capacity.push(available);
        self.heartbeat.resources_total_label.push(label.to_string());
        self.heartbeat.resources_total_capacity.push(total);
        self
    }

    pub fn with_available_labels(mut self, labels: &[&str]) -> Self {
        self.heartbeat.resources_available_label =
            labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_available_capacities(mut self, capacities: &[f64]) -> Self {
        self.heartbeat.resources_available_capacity = capacities.to_vec();
        self
    }

    pub fn with_total_labels(mut self, labels: &[&str]) -> Self {
        self.heartbeat.resources_total_label = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_total_capacities(mut self, capacities: &[f64]) -> Self {
        self.heartbeat.resources_total_capacity = capacities.to_vec();
        self
    }

    pub fn build(self) -> HeartbeatTableData {
        self.heartbeat
    }
}

pub fn heartbeat_batch(batch: Vec<HeartbeatTableData>) -> HeartbeatBatchTableData {
    HeartbeatBatchTableData { batch }
}

pub fn heartbeat_batch_payload(batch: Vec<HeartbeatTableData>) -> Vec<u8> {
    GcsEntry::single("", heartbeat_batch(batch)).encode().unwrap()
}

pub fn job_data(job_id: JobId, is_dead: bool) -> JobTableData {
    JobTableData {
        job_id,
        is_dead,
        timestamp: 1,
        node_manager_address: "10.0.0.1".to_string(),
        driver_pid: 4242,
    }
}

pub fn job_removed_payload(job_id: JobId) -> Vec<u8> {
    GcsEntry::single(job_id.hex(), job_data(job_id, true))
        .encode()
        .unwrap()
}

pub fn node_insertion(client_id: NodeId, address: &str) -> NodeTableEntry {
    NodeTableEntry {
        client_id,
        node_manager_address: address.to_string(),
        aux_address: None,
        is_insertion: true,
    }
}

pub fn node_removal(client_id: NodeId) -> NodeTableEntry {
    NodeTableEntry {
        client_id,
        node_manager_address: String::new(),
        aux_address: None,
        is_insertion: false,
    }
}
