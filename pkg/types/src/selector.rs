use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label predicate selecting the workloads a sleep schedule manages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadSelector {
    /// Every listed label must be present with the same value (AND).
    #[serde(default)]
    pub match_labels: HashMap<String, String>,
}

impl WorkloadSelector {
    /// Check whether a workload's labels satisfy this selector.
    /// An empty selector matches nothing, so a blank schedule cannot
    /// pause an entire namespace by accident.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        if self.match_labels.is_empty() {
            return false;
        }
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}
