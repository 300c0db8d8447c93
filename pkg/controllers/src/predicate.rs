use pkg_constants::state::SLEEPSCHEDULE_PREFIX;
use pkg_state::watch::{EventType, WatchEvent};

/// Event filter for the controllers' watch streams: creations and
/// updates of sleep schedules re-trigger reconciliation, deletions only
/// clean up pending timers, and everything else is ignored.
pub fn should_reevaluate(event: &WatchEvent) -> bool {
    event.event_type == EventType::Put && event.has_prefix(SLEEPSCHEDULE_PREFIX)
}

/// True when a sleep schedule was removed from the registry.
pub fn is_schedule_removal(event: &WatchEvent) -> bool {
    event.event_type == EventType::Delete && event.has_prefix(SLEEPSCHEDULE_PREFIX)
}
