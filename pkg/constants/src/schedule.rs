//! Sleep schedule defaults and scaling constants.

/// IANA time zone assumed when a schedule does not name one.
pub const DEFAULT_TIME_ZONE: &str = "UTC";

/// Daily pause window start, local wall-clock `HH:MM`.
pub const DEFAULT_DAILY_START: &str = "09:00";

/// Daily pause window end, local wall-clock `HH:MM`.
pub const DEFAULT_DAILY_END: &str = "18:00";

/// Annotation holding the replica count captured at scale-down time.
/// Scale-up restores exactly this value and then clears the annotation.
pub const PRIOR_REPLICAS_ANNOTATION: &str = "sleeper.io/prior-replicas";

/// Replicas restored when the prior-replicas annotation exists but
/// cannot be parsed.
pub const DEFAULT_RESTORE_REPLICAS: u32 = 1;

/// Floor for evaluator requeue delays, so a boundary-exact evaluation
/// never requeues with a zero delay.
pub const MIN_REQUEUE_SECS: u64 = 1;

/// Fallback sweep interval for the schedule controller when no timer
/// boundary is pending.
pub const RESYNC_INTERVAL_SECS: u64 = 60;

/// Sweep interval for the workload scaler; also the retry cadence for
/// partially failed actuation passes.
pub const SCALER_RESYNC_INTERVAL_SECS: u64 = 30;
