//! Controllers reconciling sleep schedules and the workloads they pause.

pub mod predicate;
pub mod sleepschedule;
pub mod workload_api;
pub mod workloadscaler;
