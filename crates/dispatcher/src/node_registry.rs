use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use monitor_core::models::{live_nodes, NodeId, NodeRecord};
use monitor_core::{CoordinationStore, MonitorResult};

/// 节点ID到网络地址的快照
///
/// 每个周期从存活节点表整体重建，不做增量修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRegistry {
    addresses: HashMap<NodeId, String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一次批量读取节点表并构建新的快照；读取失败直接返回错误，不保留旧快照
    pub async fn refresh(store: &dyn CoordinationStore) -> MonitorResult<Self> {
        let entries = store.read_node_table().await?;
        let registry = Self::from_records(live_nodes(entries));
        debug!("节点注册表已刷新，共 {} 个存活节点", registry.len());
        Ok(registry)
    }

    pub fn from_records(records: Vec<NodeRecord>) -> Self {
        let mut addresses = HashMap::with_capacity(records.len());
        for record in records {
            match record.host() {
                Some(host) => {
                    addresses.insert(record.node_id, host.to_string());
                }
                None => warn!("节点 {} 没有可用的网络地址，跳过", record.node_id),
            }
        }
        Self { addresses }
    }

    pub fn resolve(&self, node_id: &NodeId) -> Option<&str> {
        self.addresses.get(node_id).map(String::as_str)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.addresses.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// 当前快照中的所有网络地址
    pub fn addresses(&self) -> HashSet<String> {
        self.addresses.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: u8, primary: &str, aux: Option<&str>) -> NodeRecord {
        NodeRecord {
            node_id: NodeId::from([seed; NodeId::SIZE]),
            primary_address: primary.to_string(),
            aux_address: aux.map(str::to_string),
        }
    }

    #[test]
    fn test_from_records_prefers_primary_host() {
        let registry = NodeRegistry::from_records(vec![
            record(1, "10.0.0.1:6379", Some("10.0.0.9:1")),
            record(2, "", Some("10.0.0.2:8076")),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve(&NodeId::from([1; NodeId::SIZE])),
            Some("10.0.0.1")
        );
        assert_eq!(
            registry.resolve(&NodeId::from([2; NodeId::SIZE])),
            Some("10.0.0.2")
        );
    }

    #[test]
    fn test_nodes_without_address_are_skipped() {
        let registry = NodeRegistry::from_records(vec![record(3, "", None)]);
        assert!(registry.is_empty());
        assert!(!registry.contains(&NodeId::from([3; NodeId::SIZE])));
    }
}
