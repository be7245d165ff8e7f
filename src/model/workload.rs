use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::work_item::{sort_by_severity, WorkItem};

/// Per-member aggregate. `total` always equals `items.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub total: usize,
    pub items: Vec<WorkItem>,
}

impl WorkloadEntry {
    pub fn push(&mut self, item: WorkItem) {
        self.items.push(item);
        self.total += 1;
    }

    pub fn count_in_state(&self, state: &str) -> usize {
        self.items.iter().filter(|i| i.state == state).count()
    }
}

/// Member key → entry, ordered by key.
pub type WorkloadData = BTreeMap<String, WorkloadEntry>;

/// Result of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub data: WorkloadData,
    /// Collections or projects skipped because a call failed, one line each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl WorkloadReport {
    /// Add a roster member with no items unless already present.
    pub fn ensure_member(&mut self, name: &str) {
        self.data.entry(name.to_string()).or_default();
    }

    pub fn assign(&mut self, item: WorkItem) {
        self.data
            .entry(item.assigned_to.clone())
            .or_default()
            .push(item);
    }

    pub fn sort_items(&mut self) {
        for entry in self.data.values_mut() {
            sort_by_severity(&mut entry.items);
        }
    }

    pub fn total_items(&self) -> usize {
        self.data.values().map(|e| e.total).sum()
    }
}
