use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{error, info, warn};

use pkg_constants::schedule::RESYNC_INTERVAL_SECS;
use pkg_constants::state::SLEEPSCHEDULE_PREFIX;
use pkg_schedule::{Trigger, evaluate};
use pkg_state::client::StateStore;
use pkg_types::sleepschedule::SleepSchedule;
use pkg_types::validate::validate_name;

use crate::predicate;

/// Controller that owns SleepSchedule status: it classifies each
/// schedule against its time window and persists the resulting state.
///
/// Wake-ups come from the evaluator's own requeue delays (exact
/// boundary differences, so no busy polling) and from config-change
/// events on the watch stream. One loop task serializes all work per
/// resource, so concurrent triggers cannot race on the same status.
pub struct SleepScheduleController {
    store: StateStore,
    resync_interval: Duration,
}

impl SleepScheduleController {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            resync_interval: Duration::from_secs(RESYNC_INTERVAL_SECS),
        }
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "SleepScheduleController started (resync={}s)",
                self.resync_interval.as_secs()
            );
            let mut events = self.store.events().subscribe();
            // Registry key → next evaluation deadline.
            let mut due: HashMap<String, Instant> = HashMap::new();
            loop {
                let wake = next_wake(&due, self.resync_interval);
                tokio::select! {
                    _ = tokio::time::sleep_until(wake) => {
                        if let Err(e) = self.reconcile_all(Trigger::Timer, &mut due).await {
                            warn!("SleepScheduleController reconcile error: {}", e);
                        }
                    }
                    event = events.recv() => match event {
                        Ok(ev) if predicate::should_reevaluate(&ev) => {
                            if let Err(e) = self
                                .reconcile_key(&ev.key, Trigger::ConfigChange, &mut due)
                                .await
                            {
                                warn!("SleepScheduleController reconcile error for {}: {}", ev.key, e);
                            }
                        }
                        Ok(ev) if predicate::is_schedule_removal(&ev) => {
                            due.remove(&ev.key);
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => {
                            warn!("SleepScheduleController watch lagged by {} events", n);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }

    async fn reconcile_all(
        &self,
        trigger: Trigger,
        due: &mut HashMap<String, Instant>,
    ) -> anyhow::Result<()> {
        let entries = self.store.list_prefix(SLEEPSCHEDULE_PREFIX).await?;
        for (key, value) in entries {
            let schedule: SleepSchedule = match serde_json::from_slice(&value) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Err(e) = self.reconcile(&key, schedule, trigger, due).await {
                warn!("SleepSchedule {}: reconcile failed: {}", key, e);
            }
        }
        Ok(())
    }

    async fn reconcile_key(
        &self,
        key: &str,
        trigger: Trigger,
        due: &mut HashMap<String, Instant>,
    ) -> anyhow::Result<()> {
        let Some(value) = self.store.get(key).await? else {
            due.remove(key);
            return Ok(());
        };
        let schedule: SleepSchedule = serde_json::from_slice(&value)?;
        self.reconcile(key, schedule, trigger, due).await
    }

    async fn reconcile(
        &self,
        key: &str,
        mut schedule: SleepSchedule,
        trigger: Trigger,
        due: &mut HashMap<String, Instant>,
    ) -> anyhow::Result<()> {
        if let Err(e) = validate_name(&schedule.name) {
            warn!("SleepSchedule {}: skipping, {}", key, e);
            return Ok(());
        }

        let now = Utc::now();
        match evaluate(now, &schedule.spec.schedule, schedule.status.state) {
            Ok(eval) => {
                match eval.requeue_after {
                    Some(delay) => {
                        due.insert(key.to_string(), Instant::now() + delay);
                    }
                    None => {
                        due.remove(key);
                    }
                }

                let first_evaluation = schedule.status.last_transition_time.is_none();
                let changed = eval.state != schedule.status.state
                    || schedule.status.reason.is_some()
                    || first_evaluation;
                if changed {
                    info!(
                        "SleepSchedule {}/{}: {} → {} (trigger={}, requeue={:?})",
                        schedule.namespace,
                        schedule.name,
                        schedule.status.state,
                        eval.state,
                        trigger,
                        eval.requeue_after
                    );
                    schedule.status.state = eval.state;
                    schedule.status.last_transition_time = Some(now);
                    schedule.status.reason = None;
                    let data = serde_json::to_vec(&schedule)?;
                    self.store.put(key, &data).await?;
                }
            }
            Err(e) => {
                // Non-retryable configuration error: surface it on
                // status and stop requeuing. The correcting config
                // change is itself the next trigger.
                due.remove(key);
                let reason = e.to_string();
                if schedule.status.reason.as_deref() != Some(reason.as_str()) {
                    error!(
                        "SleepSchedule {}/{}: configuration error: {}",
                        schedule.namespace, schedule.name, reason
                    );
                    schedule.status.reason = Some(reason);
                    let data = serde_json::to_vec(&schedule)?;
                    self.store.put(key, &data).await?;
                }
            }
        }
        Ok(())
    }
}

/// Earliest pending deadline, or the resync fallback when none is due
/// sooner.
fn next_wake(due: &HashMap<String, Instant>, resync: Duration) -> Instant {
    let fallback = Instant::now() + resync;
    due.values().copied().min().unwrap_or(fallback).min(fallback)
}
