use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::selector::WorkloadSelector;

// --- Sleep state machine ---

/// Lifecycle state of a sleep schedule.
///
/// `Pending` before the active period opens, then `Resumed` and `Paused`
/// cycling once per day, then `Abandoned` once the active period has
/// elapsed. `Abandoned` is terminal: the schedule is not evaluated again
/// until its date bounds are advanced by a config change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepState {
    #[default]
    Pending,
    Paused,
    Resumed,
    Abandoned,
}

impl std::fmt::Display for SleepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SleepState::Pending => "Pending",
            SleepState::Paused => "Paused",
            SleepState::Resumed => "Resumed",
            SleepState::Abandoned => "Abandoned",
        };
        write!(f, "{}", s)
    }
}

// --- Schedule window ---

/// Daily pause window inside an overall active date range.
/// All optional fields default at evaluation time, not at parse time,
/// so "today" is always the evaluation day in the configured zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// IANA time zone name; "UTC" when absent.
    #[serde(default)]
    pub time_zone: Option<String>,
    /// Manual escape hatch: forces Paused until unset by hand.
    #[serde(default)]
    pub pause_override: bool,
    /// First date (inclusive, `YYYY-MM-DD`) on which daily pausing applies.
    /// Today when absent.
    #[serde(default)]
    pub active_from: Option<String>,
    /// Last date (inclusive, `YYYY-MM-DD`); today + 1 day when absent.
    #[serde(default)]
    pub active_until: Option<String>,
    /// Daily pause start, local wall clock `HH:MM`; 09:00 when absent.
    #[serde(default)]
    pub daily_start: Option<String>,
    /// Daily pause end, local wall clock `HH:MM`; 18:00 when absent.
    #[serde(default)]
    pub daily_end: Option<String>,
}

// --- SleepSchedule status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleepScheduleStatus {
    #[serde(default)]
    pub state: SleepState,
    /// When `state` last changed. Not bumped by no-op evaluations.
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Human-readable cause when evaluation fails on a configuration
    /// error (bad zone, unparseable date). Cleared on the next success.
    #[serde(default)]
    pub reason: Option<String>,
}

// --- SleepSchedule spec ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleepScheduleSpec {
    #[serde(default)]
    pub schedule: ScheduleSpec,
    /// Selects the Deployments this schedule pauses and resumes.
    #[serde(default)]
    pub selector: WorkloadSelector,
}

// --- SleepSchedule ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepSchedule {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub spec: SleepScheduleSpec,
    #[serde(default)]
    pub status: SleepScheduleStatus,
    pub created_at: DateTime<Utc>,
}
