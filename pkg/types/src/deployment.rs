use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Deployment status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub ready_replicas: u32,
    pub available_replicas: u32,
}

// --- Deployment spec ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub replicas: u32,
}

// --- Deployment ---

/// A scalable workload. Sleep schedules select deployments by label and
/// drive `spec.replicas`; the prior-replicas annotation holds the count
/// to restore while a deployment is paused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
    /// Monotonically increasing generation; bumped on spec changes
    #[serde(default)]
    pub generation: u64,
    /// Last generation observed by the controller
    #[serde(default)]
    pub observed_generation: u64,
    pub created_at: DateTime<Utc>,
}
