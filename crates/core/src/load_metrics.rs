use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use chrono::{DateTime, Duration, Utc};

use crate::models::ResourceVector;
use crate::traits::LoadMetricsSink;

/// 集群负载视图，按节点网络地址聚合心跳上报的资源
#[derive(Debug, Clone, Default)]
pub struct LoadMetrics {
    static_resources_by_ip: HashMap<String, ResourceVector>,
    dynamic_resources_by_ip: HashMap<String, ResourceVector>,
    last_used_time_by_ip: HashMap<String, DateTime<Utc>>,
    last_heartbeat_time_by_ip: HashMap<String, DateTime<Utc>>,
}

/// 资源使用汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceUsage {
    pub num_nodes: usize,
    pub num_nonidle: usize,
    pub used: ResourceVector,
    pub total: ResourceVector,
}

impl ResourceUsage {
    /// 所有资源中使用率最高的比例
    pub fn max_utilization(&self) -> f64 {
        self.total
            .iter()
            .filter(|(_, total)| *total > 0.0)
            .map(|(label, total)| self.used.get_or_zero(label) / total)
            .fold(0.0, f64::max)
    }
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_at(
        &mut self,
        ip: &str,
        static_resources: ResourceVector,
        dynamic_resources: ResourceVector,
        now: DateTime<Utc>,
    ) {
        // 总量中存在而可用量中缺失的资源视为已全部占用
        let mut dynamic_update = dynamic_resources.clone();
        for label in static_resources.labels() {
            if !dynamic_update.contains(label) {
                dynamic_update.insert(label, 0.0);
            }
        }

        if !self.last_used_time_by_ip.contains_key(ip) || static_resources != dynamic_resources {
            self.last_used_time_by_ip.insert(ip.to_string(), now);
        }
        self.last_heartbeat_time_by_ip.insert(ip.to_string(), now);
        self.static_resources_by_ip
            .insert(ip.to_string(), static_resources);
        self.dynamic_resources_by_ip
            .insert(ip.to_string(), dynamic_update);
    }

    /// 丢弃不在活跃地址集合中的节点
    pub fn prune_active_ips(&mut self, active_ips: &HashSet<String>) {
        self.static_resources_by_ip
            .retain(|ip, _| active_ips.contains(ip));
        self.dynamic_resources_by_ip
            .retain(|ip, _| active_ips.contains(ip));
        self.last_used_time_by_ip
            .retain(|ip, _| active_ips.contains(ip));
        self.last_heartbeat_time_by_ip
            .retain(|ip, _| active_ips.contains(ip));
    }

    pub fn num_workers_connected(&self) -> usize {
        self.static_resources_by_ip.len()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.static_resources_by_ip.keys().map(String::as_str)
    }

    pub fn total_resources(&self, ip: &str) -> Option<&ResourceVector> {
        self.static_resources_by_ip.get(ip)
    }

    pub fn available_resources(&self, ip: &str) -> Option<&ResourceVector> {
        self.dynamic_resources_by_ip.get(ip)
    }

    pub fn last_used_time(&self, ip: &str) -> Option<DateTime<Utc>> {
        self.last_used_time_by_ip.get(ip).copied()
    }

    pub fn last_heartbeat_time(&self, ip: &str) -> Option<DateTime<Utc>> {
        self.last_heartbeat_time_by_ip.get(ip).copied()
    }

    /// 超过 `idle_timeout` 未被使用的节点地址
    pub fn idle_addresses(&self, idle_timeout: Duration, now: DateTime<Utc>) -> Vec<String> {
        let mut idle: Vec<String> = self
            .last_used_time_by_ip
            .iter()
            .filter(|(_, last_used)| now - **last_used > idle_timeout)
            .map(|(ip, _)| ip.clone())
            .collect();
        idle.sort();
        idle
    }

    pub fn resource_usage(&self) -> ResourceUsage {
        let mut usage = ResourceUsage {
            num_nodes: self.static_resources_by_ip.len(),
            ..ResourceUsage::default()
        };

        for (ip, max_resources) in &self.static_resources_by_ip {
            let avail_resources = self.dynamic_resources_by_ip.get(ip);
            let mut is_idle = true;
            for (label, max_capacity) in max_resources.iter() {
                let avail = avail_resources
                    .map(|avail| avail.get_or_zero(label))
                    .unwrap_or(0.0);
                let used = (max_capacity - avail).max(0.0);
                if used > 0.0 {
                    is_idle = false;
                }
                usage.used.add(label, used);
                usage.total.add(label, max_capacity);
            }
            if !is_idle {
                usage.num_nonidle += 1;
            }
        }

        usage
    }

    pub fn summary(&self) -> String {
        let usage = self.resource_usage();
        let mut out = format!(
            "NumNodesConnected={}, NumNodesUsed={}",
            usage.num_nodes, usage.num_nonidle
        );
        for (label, total) in usage.total.iter() {
            let _ = write!(
                out,
                ", {}={}/{}",
                label,
                usage.used.get_or_zero(label),
                total
            );
        }
        out
    }
}

impl LoadMetricsSink for LoadMetrics {
    fn update(&mut self, address: &str, total: ResourceVector, available: ResourceVector) {
        self.update_at(address, total, available, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> ResourceVector {
        pairs.iter().map(|(l, c)| (*l, *c)).collect()
    }

    #[test]
    fn test_update_fills_missing_dynamic_resources() {
        let mut metrics = LoadMetrics::new();
        metrics.update_at(
            "10.0.0.1",
            vector(&[("CPU", 4.0), ("GPU", 1.0)]),
            vector(&[("CPU", 2.0)]),
            Utc::now(),
        );

        let available = metrics.available_resources("10.0.0.1").unwrap();
        assert_eq!(available.get("CPU"), Some(2.0));
        assert_eq!(available.get("GPU"), Some(0.0));
    }

    #[test]
    fn test_last_used_only_moves_when_busy() {
        let mut metrics = LoadMetrics::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(30);
        let t2 = t0 + Duration::seconds(60);
        let idle = vector(&[("CPU", 4.0)]);

        metrics.update_at("10.0.0.1", idle.clone(), idle.clone(), t0);
        metrics.update_at("10.0.0.1", idle.clone(), idle.clone(), t1);
        assert_eq!(metrics.last_used_time("10.0.0.1"), Some(t0));
        assert_eq!(metrics.last_heartbeat_time("10.0.0.1"), Some(t1));

        metrics.update_at("10.0.0.1", idle, vector(&[("CPU", 1.0)]), t2);
        assert_eq!(metrics.last_used_time("10.0.0.1"), Some(t2));
    }

    #[test]
    fn test_prune_active_ips() {
        let mut metrics = LoadMetrics::new();
        let now = Utc::now();
        metrics.update_at("a", vector(&[("CPU", 1.0)]), vector(&[("CPU", 1.0)]), now);
        metrics.update_at("b", vector(&[("CPU", 1.0)]), vector(&[("CPU", 1.0)]), now);

        let active: HashSet<String> = ["b".to_string()].into_iter().collect();
        metrics.prune_active_ips(&active);

        assert_eq!(metrics.num_workers_connected(), 1);
        assert!(metrics.total_resources("a").is_none());
        assert!(metrics.last_used_time("a").is_none());
    }

    #[test]
    fn test_resource_usage() {
        let mut metrics = LoadMetrics::new();
        let now = Utc::now();
        metrics.update_at("a", vector(&[("CPU", 4.0)]), vector(&[("CPU", 1.0)]), now);
        metrics.update_at("b", vector(&[("CPU", 4.0)]), vector(&[("CPU", 4.0)]), now);

        let usage = metrics.resource_usage();
        assert_eq!(usage.num_nodes, 2);
        assert_eq!(usage.num_nonidle, 1);
        assert_eq!(usage.used.get("CPU"), Some(3.0));
        assert_eq!(usage.total.get("CPU"), Some(8.0));
        assert!((usage.max_utilization() - 0.375).abs() < f64::EPSILON);

        let summary = metrics.summary();
        assert!(summary.contains("NumNodesConnected=2"));
        assert!(summary.contains("CPU=3/8"));
    }

    #[test]
    fn test_idle_addresses() {
        let mut metrics = LoadMetrics::new();
        let t0 = Utc::now();
        let idle = vector(&[("CPU", 2.0)]);
        metrics.update_at("old", idle.clone(), idle.clone(), t0);
        metrics.update_at("new", idle.clone(), idle, t0 + Duration::minutes(10));

        let result = metrics.idle_addresses(Duration::minutes(5), t0 + Duration::minutes(11));
        assert_eq!(result, vec!["old".to_string()]);
    }
}
