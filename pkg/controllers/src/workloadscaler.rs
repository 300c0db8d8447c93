use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use pkg_constants::schedule::{
    DEFAULT_RESTORE_REPLICAS, PRIOR_REPLICAS_ANNOTATION, SCALER_RESYNC_INTERVAL_SECS,
};
use pkg_constants::state::SLEEPSCHEDULE_PREFIX;
use pkg_state::client::StateStore;
use pkg_types::deployment::Deployment;
use pkg_types::selector::WorkloadSelector;
use pkg_types::sleepschedule::{SleepSchedule, SleepState};

use crate::predicate;
use crate::workload_api::{StoreWorkloadApi, WorkloadApi};

/// One workload the pass could not update, kept for the report.
#[derive(Debug, Clone)]
pub struct FailedWorkload {
    pub name: String,
    pub error: String,
}

/// Outcome of one actuation pass over the matched workload set.
#[derive(Debug, Default)]
pub struct ActuationReport {
    /// Scaled to zero this pass.
    pub scaled: Vec<String>,
    /// Restored to their recorded replica count this pass.
    pub restored: Vec<String>,
    /// Already in the desired shape; untouched.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedWorkload>,
}

impl ActuationReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn touched(&self) -> usize {
        self.scaled.len() + self.restored.len()
    }
}

enum Outcome {
    Scaled,
    Restored,
    Skipped,
}

/// Reconcile the matched workloads' replica counts with the persisted
/// schedule state. Idempotent: a repeat pass with no drift only skips.
/// One workload's failure never aborts the rest of the list; a listing
/// failure is an `Err` for the caller to retry.
pub async fn actuate(
    api: &dyn WorkloadApi,
    state: SleepState,
    selector: &WorkloadSelector,
    namespace: &str,
) -> anyhow::Result<ActuationReport> {
    let mut report = ActuationReport::default();
    if !matches!(state, SleepState::Paused | SleepState::Resumed) {
        // Pending and Abandoned take no scaling action.
        return Ok(report);
    }

    let workloads = api.list_workloads(selector, namespace).await?;
    for deploy in &workloads {
        let outcome = match state {
            SleepState::Paused => pause_one(api, deploy).await,
            SleepState::Resumed => resume_one(api, deploy).await,
            _ => unreachable!(),
        };
        match outcome {
            Ok(Outcome::Scaled) => report.scaled.push(deploy.name.clone()),
            Ok(Outcome::Restored) => report.restored.push(deploy.name.clone()),
            Ok(Outcome::Skipped) => report.skipped.push(deploy.name.clone()),
            Err(e) => {
                warn!(
                    "Deployment {}/{}: actuation failed, leaving for retry: {}",
                    deploy.namespace, deploy.name, e
                );
                report.failed.push(FailedWorkload {
                    name: deploy.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

/// Scale one workload to zero, recording its prior replica count first.
/// A workload we cannot record is never scaled down.
async fn pause_one(api: &dyn WorkloadApi, deploy: &Deployment) -> anyhow::Result<Outcome> {
    let has_record = deploy.annotations.contains_key(PRIOR_REPLICAS_ANNOTATION);
    if deploy.spec.replicas == 0 {
        // Already down (or at steady-state zero with nothing to restore).
        return Ok(Outcome::Skipped);
    }
    if !has_record {
        api.set_annotation(
            &deploy.namespace,
            &deploy.id,
            PRIOR_REPLICAS_ANNOTATION,
            Some(deploy.spec.replicas.to_string()),
        )
        .await?;
    }
    api.update_replicas(&deploy.namespace, &deploy.id, 0).await?;
    Ok(Outcome::Scaled)
}

/// Restore one workload to its recorded replica count and clear the
/// record. Workloads without a record are already at steady state.
async fn resume_one(api: &dyn WorkloadApi, deploy: &Deployment) -> anyhow::Result<Outcome> {
    let Some(raw) = deploy.annotations.get(PRIOR_REPLICAS_ANNOTATION) else {
        return Ok(Outcome::Skipped);
    };
    let replicas = match raw.parse::<u32>() {
        Ok(n) => n,
        Err(_) => {
            warn!(
                "Deployment {}/{}: unreadable prior-replicas record '{}', restoring {}",
                deploy.namespace, deploy.name, raw, DEFAULT_RESTORE_REPLICAS
            );
            DEFAULT_RESTORE_REPLICAS
        }
    };
    api.update_replicas(&deploy.namespace, &deploy.id, replicas)
        .await?;
    api.set_annotation(&deploy.namespace, &deploy.id, PRIOR_REPLICAS_ANNOTATION, None)
        .await?;
    Ok(Outcome::Restored)
}

/// Controller that reconciles workload replica counts against each
/// schedule's persisted status. Reads status only; the schedule
/// controller owns it.
pub struct WorkloadScalerController {
    store: StateStore,
    api: Arc<dyn WorkloadApi>,
    sweep_interval: Duration,
}

impl WorkloadScalerController {
    pub fn new(store: StateStore) -> Self {
        let api = Arc::new(StoreWorkloadApi::new(store.clone()));
        Self {
            store,
            api,
            sweep_interval: Duration::from_secs(SCALER_RESYNC_INTERVAL_SECS),
        }
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "WorkloadScalerController started (sweep={}s)",
                self.sweep_interval.as_secs()
            );
            let mut events = self.store.events().subscribe();
            let mut interval = tokio::time::interval(self.sweep_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.reconcile_all().await {
                            warn!("WorkloadScalerController sweep error: {}", e);
                        }
                    }
                    event = events.recv() => match event {
                        // A Put on a schedule key is the signal that a
                        // freshly persisted status is readable.
                        Ok(ev) if predicate::should_reevaluate(&ev) => {
                            if let Err(e) = self.reconcile_key(&ev.key).await {
                                warn!("WorkloadScalerController reconcile error for {}: {}", ev.key, e);
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => {
                            warn!("WorkloadScalerController watch lagged by {} events", n);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }

    async fn reconcile_all(&self) -> anyhow::Result<()> {
        let entries = self.store.list_prefix(SLEEPSCHEDULE_PREFIX).await?;
        for (_key, value) in entries {
            let schedule: SleepSchedule = match serde_json::from_slice(&value) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Err(e) = self.reconcile(&schedule).await {
                warn!(
                    "SleepSchedule {}/{}: actuation pass failed, will retry: {}",
                    schedule.namespace, schedule.name, e
                );
            }
        }
        Ok(())
    }

    async fn reconcile_key(&self, key: &str) -> anyhow::Result<()> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(());
        };
        let schedule: SleepSchedule = serde_json::from_slice(&value)?;
        self.reconcile(&schedule).await
    }

    async fn reconcile(&self, schedule: &SleepSchedule) -> anyhow::Result<()> {
        let report = actuate(
            self.api.as_ref(),
            schedule.status.state,
            &schedule.spec.selector,
            &schedule.namespace,
        )
        .await?;

        if report.is_partial() {
            warn!(
                "SleepSchedule {}/{}: partial actuation, {} updated, {} failed (next sweep retries only the failed set)",
                schedule.namespace,
                schedule.name,
                report.touched(),
                report.failed.len()
            );
        } else if report.touched() > 0 {
            info!(
                "SleepSchedule {}/{}: state {} applied, scaled down {}, restored {}",
                schedule.namespace,
                schedule.name,
                schedule.status.state,
                report.scaled.len(),
                report.restored.len()
            );
        }
        Ok(())
    }
}
