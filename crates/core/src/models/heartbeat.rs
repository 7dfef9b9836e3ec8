use serde::{Deserialize, Serialize};

use super::ids::NodeId;
use super::resources::ResourceVector;
use crate::errors::{MonitorError, MonitorResult};

/// 单个节点的心跳快照
///
/// 四个数组按位置对齐：第 `i` 个可用标签、可用容量、总量标签、总量容量
/// 描述同一资源下标，必须按下标组合，不能各自按标签查找。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatTableData {
    pub client_id: NodeId,
    #[serde(default)]
    pub resources_available_label: Vec<String>,
    #[serde(default)]
    pub resources_available_capacity: Vec<f64>,
    #[serde(default)]
    pub resources_total_label: Vec<String>,
    #[serde(default)]
    pub resources_total_capacity: Vec<f64>,
}

impl HeartbeatTableData {
    /// 按共享下标重组 (总量, 可用量) 两个资源向量
    pub fn resource_vectors(&self) -> MonitorResult<(ResourceVector, ResourceVector)> {
        let num_resources = self.resources_available_label.len();
        let lengths = [
            self.resources_available_capacity.len(),
            self.resources_total_label.len(),
            self.resources_total_capacity.len(),
        ];
        if lengths.iter().any(|len| *len != num_resources) {
            return Err(MonitorError::Decode(format!(
                "heartbeat from {} has mismatched resource arrays: available_label={}, \
                 available_capacity={}, total_label={}, total_capacity={}",
                self.client_id, num_resources, lengths[0], lengths[1], lengths[2]
            )));
        }

        let mut total = ResourceVector::new();
        let mut available = ResourceVector::new();
        for i in 0..num_resources {
            available.insert(
                self.resources_available_label[i].clone(),
                self.resources_available_capacity[i],
            );
            total.insert(
                self.resources_total_label[i].clone(),
                self.resources_total_capacity[i],
            );
        }

        Ok((total, available))
    }
}

/// 一次通知中打包的多节点心跳，按数组顺序处理
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatBatchTableData {
    pub batch: Vec<HeartbeatTableData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat() -> HeartbeatTableData {
        HeartbeatTableData {
            client_id: NodeId::from([1u8; NodeId::SIZE]),
            resources_available_label: vec!["GPU".to_string(), "CPU".to_string()],
            resources_available_capacity: vec![1.0, 3.0],
            resources_total_label: vec!["GPU".to_string(), "CPU".to_string()],
            resources_total_capacity: vec![2.0, 8.0],
        }
    }

    #[test]
    fn test_vectors_are_paired_by_index() {
        let (total, available) = heartbeat().resource_vectors().unwrap();

        assert_eq!(total.get("CPU"), Some(8.0));
        assert_eq!(total.get("GPU"), Some(2.0));
        assert_eq!(available.get("CPU"), Some(3.0));
        assert_eq!(available.get("GPU"), Some(1.0));
    }

    #[test]
    fn test_total_labels_are_read_positionally() {
        let mut hb = heartbeat();
        // 总量标签顺序与可用标签顺序不同时，仍按各自数组的下标取值
        hb.resources_total_label = vec!["CPU".to_string(), "GPU".to_string()];
        let (total, available) = hb.resource_vectors().unwrap();

        assert_eq!(total.get("CPU"), Some(2.0));
        assert_eq!(total.get("GPU"), Some(8.0));
        assert_eq!(available.get("GPU"), Some(1.0));
    }

    #[test]
    fn test_mismatched_lengths_are_a_decode_fault() {
        let mut hb = heartbeat();
        hb.resources_total_capacity.pop();

        let err = hb.resource_vectors().unwrap_err();
        assert!(matches!(err, MonitorError::Decode(_)));
    }

    #[test]
    fn test_empty_heartbeat() {
        let hb = HeartbeatTableData {
            client_id: NodeId::from([2u8; NodeId::SIZE]),
            resources_available_label: vec![],
            resources_available_capacity: vec![],
            resources_total_label: vec![],
            resources_total_capacity: vec![],
        };
        let (total, available) = hb.resource_vectors().unwrap();
        assert!(total.is_empty());
        assert!(available.is_empty());
    }
}
