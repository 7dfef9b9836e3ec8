use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ids::NodeId;

/// 节点表日志条目
///
/// 节点表是只追加的日志：节点加入时写入 `is_insertion = true`，
/// 节点移除时追加一条 `is_insertion = false`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTableEntry {
    pub client_id: NodeId,
    pub node_manager_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_address: Option<String>,
    #[serde(default = "default_insertion")]
    pub is_insertion: bool,
}

fn default_insertion() -> bool {
    true
}

/// 存活节点记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub primary_address: String,
    pub aux_address: Option<String>,
}

impl NodeRecord {
    /// 优先使用主地址，缺失时退回辅助地址；只取第一个冒号之前的主机部分
    pub fn host(&self) -> Option<&str> {
        let address = if self.primary_address.is_empty() {
            self.aux_address.as_deref()?
        } else {
            self.primary_address.as_str()
        };
        let host = address.split(':').next().unwrap_or(address);
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }
}

/// 将节点日志归约为存活节点集合：每个节点取最后一条记录，仅保留插入记录
pub fn live_nodes(entries: Vec<NodeTableEntry>) -> Vec<NodeRecord> {
    let mut order = Vec::new();
    let mut latest: HashMap<NodeId, NodeTableEntry> = HashMap::new();

    for entry in entries {
        if !latest.contains_key(&entry.client_id) {
            order.push(entry.client_id);
        }
        latest.insert(entry.client_id, entry);
    }

    order
        .into_iter()
        .filter_map(|node_id| latest.remove(&node_id))
        .filter(|entry| entry.is_insertion)
        .map(|entry| NodeRecord {
            node_id: entry.client_id,
            primary_address: entry.node_manager_address,
            aux_address: entry.aux_address.filter(|addr| !addr.is_empty()),
        })
        .collect()
}
