use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 资源标签 → 容量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector(BTreeMap<String, f64>);

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, capacity: f64) {
        self.0.insert(label.into(), capacity);
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn get_or_zero(&self, label: &str) -> f64 {
        self.get(label).unwrap_or(0.0)
    }

    pub fn add(&mut self, label: &str, amount: f64) {
        *self.0.entry(label.to_string()).or_insert(0.0) += amount;
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, capacity)| (label.as_str(), *capacity))
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, capacity)| (label.into(), capacity))
                .collect(),
        )
    }
}
