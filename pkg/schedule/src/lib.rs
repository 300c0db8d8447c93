//! Sleep schedule evaluator.
//!
//! Pure function of (now, schedule, previous state) → (new state, requeue
//! delay). All date and time-zone arithmetic for the controllers lives
//! here; no I/O, so the state machine is testable with synthetic clocks.

use chrono::{
    DateTime, Days, Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::time::Duration;

use pkg_constants::schedule::{
    DEFAULT_DAILY_END, DEFAULT_DAILY_START, DEFAULT_TIME_ZONE, MIN_REQUEUE_SECS,
};
use pkg_types::sleepschedule::{ScheduleSpec, SleepState};

/// What caused an evaluation. The evaluator itself is trigger-agnostic;
/// controllers carry this for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    ConfigChange,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Timer => write!(f, "timer"),
            Trigger::ConfigChange => write!(f, "config-change"),
        }
    }
}

/// Non-retryable configuration errors. Evaluation for the resource halts
/// until the schedule is corrected; retrying without a config change
/// cannot succeed.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid time zone '{0}': not a known IANA zone name")]
    InvalidTimeZone(String),
    #[error("invalid {field} '{value}': expected {expected}")]
    InvalidTimeFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Result of one evaluation: the new state and, when a future boundary
/// exists, the exact delay until the state next changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub state: SleepState,
    pub requeue_after: Option<Duration>,
}

impl Evaluation {
    /// A state with no timer wake-up: terminal states, and the manual
    /// override (whose exit is a config change, not a boundary).
    fn no_requeue(state: SleepState) -> Self {
        Self {
            state,
            requeue_after: None,
        }
    }

    fn until(state: SleepState, boundary: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            state,
            requeue_after: Some(requeue_in(boundary - now)),
        }
    }
}

/// Classify `now` against the schedule and compute the next wake-up.
///
/// Checks run in order, first match wins:
/// 1. previous state Abandoned → Abandoned, terminal
/// 2. before activeFrom@dailyStart → Pending until that instant
/// 3. after activeUntil@dailyEnd → Abandoned, terminal
/// 4. pauseOverride set → Paused with no timer (unset is a config change)
/// 5. before today's window → Resumed until dailyStart
/// 6. after today's window → Resumed until tomorrow's dailyStart
/// 7. inside today's window (closed on both ends) → Paused until dailyEnd
pub fn evaluate(
    now: DateTime<Utc>,
    schedule: &ScheduleSpec,
    prev: SleepState,
) -> Result<Evaluation, ScheduleError> {
    if prev == SleepState::Abandoned {
        return Ok(Evaluation::no_requeue(SleepState::Abandoned));
    }

    let tz = parse_zone(schedule.time_zone.as_deref())?;
    let today = now.with_timezone(&tz).date_naive();

    let daily_start = parse_time("dailyStart", schedule.daily_start.as_deref(), DEFAULT_DAILY_START)?;
    let daily_end = parse_time("dailyEnd", schedule.daily_end.as_deref(), DEFAULT_DAILY_END)?;
    let active_from = match schedule.active_from.as_deref() {
        Some(s) => parse_date("activeFrom", s)?,
        None => today,
    };
    let active_until = match schedule.active_until.as_deref() {
        Some(s) => parse_date("activeUntil", s)?,
        None => today + Days::new(1),
    };

    let active_start = in_zone(tz, active_from, daily_start, "activeFrom")?;
    let active_end = in_zone(tz, active_until, daily_end, "activeUntil")?;

    if now < active_start {
        return Ok(Evaluation::until(SleepState::Pending, active_start, now));
    }
    if now > active_end {
        return Ok(Evaluation::no_requeue(SleepState::Abandoned));
    }
    if schedule.pause_override {
        return Ok(Evaluation::no_requeue(SleepState::Paused));
    }

    let today_start = in_zone(tz, today, daily_start, "dailyStart")?;
    let today_end = in_zone(tz, today, daily_end, "dailyEnd")?;

    if now < today_start {
        return Ok(Evaluation::until(SleepState::Resumed, today_start, now));
    }
    if now > today_end {
        let tomorrow_start = today_start + ChronoDuration::hours(24);
        return Ok(Evaluation::until(SleepState::Resumed, tomorrow_start, now));
    }
    if today_start <= now && now <= today_end {
        return Ok(Evaluation::until(SleepState::Paused, today_end, now));
    }

    // Unreachable while the three window checks above are exhaustive.
    Ok(Evaluation::no_requeue(SleepState::Resumed))
}

fn parse_zone(zone: Option<&str>) -> Result<Tz, ScheduleError> {
    let name = zone.unwrap_or(DEFAULT_TIME_ZONE);
    name.parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimeZone(name.to_string()))
}

fn parse_time(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<NaiveTime, ScheduleError> {
    let raw = value.unwrap_or(default);
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| ScheduleError::InvalidTimeFormat {
        field,
        value: raw.to_string(),
        expected: "HH:MM",
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ScheduleError::InvalidTimeFormat {
        field,
        value: value.to_string(),
        expected: "YYYY-MM-DD",
    })
}

/// Resolve a local wall-clock datetime in `tz` to an instant.
/// DST-ambiguous times take the earlier instant; times inside a
/// spring-forward gap are shifted one hour later.
fn in_zone(
    tz: Tz,
    date: NaiveDate,
    time: NaiveTime,
    field: &'static str,
) -> Result<DateTime<Utc>, ScheduleError> {
    let local = NaiveDateTime::new(date, time);
    let resolved = tz
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(local + ChronoDuration::hours(1)))
                .earliest()
        })
        .ok_or_else(|| ScheduleError::InvalidTimeFormat {
            field,
            value: local.to_string(),
            expected: "a representable local time",
        })?;
    Ok(resolved.with_timezone(&Utc))
}

/// Exact delay to a boundary, floored so a boundary-exact `now` never
/// produces a zero requeue.
fn requeue_in(diff: ChronoDuration) -> Duration {
    diff.to_std()
        .unwrap_or(Duration::ZERO)
        .max(Duration::from_secs(MIN_REQUEUE_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(from: &str, until: &str) -> ScheduleSpec {
        ScheduleSpec {
            time_zone: Some("UTC".to_string()),
            pause_override: false,
            active_from: Some(from.to_string()),
            active_until: Some(until.to_string()),
            daily_start: Some("09:00".to_string()),
            daily_end: Some("18:00".to_string()),
        }
    }

    fn at(date: &str, time: &str) -> DateTime<Utc> {
        format!("{}T{}:00Z", date, time)
            .parse::<DateTime<Utc>>()
            .unwrap()
    }

    fn hours(h: u64) -> Duration {
        Duration::from_secs(h * 3600)
    }

    #[test]
    fn paused_inside_window() {
        let eval = evaluate(
            at("2026-03-03", "10:00"),
            &schedule("2026-03-02", "2026-03-06"),
            SleepState::Resumed,
        )
        .unwrap();
        assert_eq!(eval.state, SleepState::Paused);
        assert_eq!(eval.requeue_after, Some(hours(8)));
    }

    #[test]
    fn resumed_after_window_wakes_tomorrow() {
        let eval = evaluate(
            at("2026-03-03", "20:00"),
            &schedule("2026-03-02", "2026-03-06"),
            SleepState::Paused,
        )
        .unwrap();
        assert_eq!(eval.state, SleepState::Resumed);
        assert_eq!(eval.requeue_after, Some(hours(13)));
    }

    #[test]
    fn resumed_before_window_wakes_at_start() {
        let eval = evaluate(
            at("2026-03-03", "06:00"),
            &schedule("2026-03-02", "2026-03-06"),
            SleepState::Resumed,
        )
        .unwrap();
        assert_eq!(eval.state, SleepState::Resumed);
        assert_eq!(eval.requeue_after, Some(hours(3)));

        // Waking exactly at the boundary lands inside the window.
        let next = evaluate(
            at("2026-03-03", "09:00"),
            &schedule("2026-03-02", "2026-03-06"),
            eval.state,
        )
        .unwrap();
        assert_eq!(next.state, SleepState::Paused);
    }

    #[test]
    fn pending_before_active_start() {
        let eval = evaluate(
            at("2026-03-01", "00:00"),
            &schedule("2026-03-02", "2026-03-06"),
            SleepState::Pending,
        )
        .unwrap();
        assert_eq!(eval.state, SleepState::Pending);
        assert_eq!(eval.requeue_after, Some(hours(33)));
    }

    #[test]
    fn abandoned_past_active_end() {
        let eval = evaluate(
            at("2026-03-08", "00:00"),
            &schedule("2026-03-02", "2026-03-06"),
            SleepState::Resumed,
        )
        .unwrap();
        assert_eq!(eval.state, SleepState::Abandoned);
        assert_eq!(eval.requeue_after, None);
    }

    #[test]
    fn abandoned_is_terminal() {
        // Even inside a valid daily window, a previously abandoned
        // schedule stays abandoned with no requeue.
        let eval = evaluate(
            at("2026-03-03", "10:00"),
            &schedule("2026-03-02", "2026-03-06"),
            SleepState::Abandoned,
        )
        .unwrap();
        assert_eq!(eval.state, SleepState::Abandoned);
        assert_eq!(eval.requeue_after, None);
    }

    #[test]
    fn window_is_closed_on_both_ends() {
        let spec = schedule("2026-03-02", "2026-03-06");
        let start = evaluate(at("2026-03-03", "09:00"), &spec, SleepState::Resumed).unwrap();
        assert_eq!(start.state, SleepState::Paused);

        let end = evaluate(at("2026-03-03", "18:00"), &spec, SleepState::Paused).unwrap();
        assert_eq!(end.state, SleepState::Paused);
        // Floored, never zero.
        assert_eq!(end.requeue_after, Some(Duration::from_secs(1)));
    }

    #[test]
    fn dates_default_to_today_and_tomorrow() {
        let spec = ScheduleSpec {
            time_zone: Some("UTC".to_string()),
            ..Default::default()
        };
        let eval = evaluate(at("2026-03-03", "10:00"), &spec, SleepState::Pending).unwrap();
        assert_eq!(eval.state, SleepState::Paused);
        assert_eq!(eval.requeue_after, Some(hours(8)));
    }

    #[test]
    fn zone_defaults_to_utc() {
        let spec = ScheduleSpec::default();
        let eval = evaluate(at("2026-03-03", "10:00"), &spec, SleepState::Pending).unwrap();
        assert_eq!(eval.state, SleepState::Paused);
    }

    #[test]
    fn daily_window_follows_the_zone() {
        // 05:00 UTC is 10:30 in Asia/Kolkata (+05:30), inside the window.
        let mut spec = schedule("2026-03-02", "2026-03-06");
        spec.time_zone = Some("Asia/Kolkata".to_string());
        let eval = evaluate(at("2026-03-03", "05:00"), &spec, SleepState::Resumed).unwrap();
        assert_eq!(eval.state, SleepState::Paused);
        // 18:00 local is 12:30 UTC, so 7h30m away.
        assert_eq!(eval.requeue_after, Some(Duration::from_secs(7 * 3600 + 1800)));
    }

    #[test]
    fn pause_override_forces_paused_without_requeue() {
        let mut spec = schedule("2026-03-02", "2026-03-06");
        spec.pause_override = true;
        // 06:00 is before the daily window; the override wins.
        let eval = evaluate(at("2026-03-03", "06:00"), &spec, SleepState::Resumed).unwrap();
        assert_eq!(eval.state, SleepState::Paused);
        assert_eq!(eval.requeue_after, None);
    }

    #[test]
    fn pause_override_does_not_outlive_the_active_period() {
        let mut spec = schedule("2026-03-02", "2026-03-06");
        spec.pause_override = true;
        let eval = evaluate(at("2026-03-08", "00:00"), &spec, SleepState::Paused).unwrap();
        assert_eq!(eval.state, SleepState::Abandoned);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let mut spec = schedule("2026-03-02", "2026-03-06");
        spec.time_zone = Some("Mars/Olympus".to_string());
        let err = evaluate(at("2026-03-03", "10:00"), &spec, SleepState::Pending).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTimeZone(z) if z == "Mars/Olympus"));
    }

    #[test]
    fn unparseable_fields_are_rejected_not_defaulted() {
        let mut spec = schedule("2026-03-02", "2026-03-06");
        spec.daily_start = Some("9am".to_string());
        let err = evaluate(at("2026-03-03", "10:00"), &spec, SleepState::Pending).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidTimeFormat { field: "dailyStart", .. }
        ));

        let mut spec = schedule("2026-03-02", "2026-03-06");
        spec.active_until = Some("06/03/2026".to_string());
        let err = evaluate(at("2026-03-03", "10:00"), &spec, SleepState::Pending).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidTimeFormat { field: "activeUntil", .. }
        ));
    }

    #[test]
    fn requeue_boundary_changes_the_state() {
        // Pending → (wake) → Paused when the active period opens mid-window.
        let spec = schedule("2026-03-02", "2026-03-06");
        let now = at("2026-03-01", "12:00");
        let eval = evaluate(now, &spec, SleepState::Pending).unwrap();
        assert_eq!(eval.state, SleepState::Pending);
        let wake = now + ChronoDuration::from_std(eval.requeue_after.unwrap()).unwrap();
        let next = evaluate(wake, &spec, eval.state).unwrap();
        assert_eq!(next.state, SleepState::Paused);
    }
}
