//! State store key layout.

/// etcd-style key prefix for SleepSchedule resources.
/// Full key: `/registry/sleepschedules/{namespace}/{name}`.
pub const SLEEPSCHEDULE_PREFIX: &str = "/registry/sleepschedules/";

/// etcd-style key prefix for Deployment workloads.
/// Full key: `/registry/deployments/{namespace}/{id}`.
pub const DEPLOYMENT_PREFIX: &str = "/registry/deployments/";

/// Capacity of the in-memory watch event ring buffer.
pub const WATCH_LOG_CAPACITY: usize = 1024;
