//! Deadline arithmetic for the multiplexing wait.
//!
//! A deadline of `None` means "never". The hub blocks until the earliest
//! deadline among its transfers, but never for less than [`MIN_WAIT`] so an
//! already-expired deadline does not turn the wait loop into a busy spin.

use std::time::{Duration, Instant};

/// Shortest time a single multiplexing call is allowed to block.
pub(crate) const MIN_WAIT: Duration = Duration::from_millis(1);

/// Absolute deadline for an inactivity `timeout` starting at `now`.
pub(crate) fn deadline_from(now: Instant, timeout: Option<Duration>) -> Option<Instant> {
    timeout
        .filter(|timeout| !timeout.is_zero())
        .and_then(|timeout| now.checked_add(timeout))
}

/// The sooner of two deadlines.
pub(crate) fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(deadline), None) | (None, Some(deadline)) => Some(deadline),
        (None, None) => None,
    }
}

/// How long to block to reach `deadline` from `now`, floored at [`MIN_WAIT`].
pub(crate) fn time_to_wait(deadline: Instant, now: Instant) -> Duration {
    let remaining = deadline.saturating_duration_since(now);
    if remaining <= MIN_WAIT {
        MIN_WAIT
    } else {
        remaining
    }
}

pub(crate) fn is_expired(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|deadline| deadline < now)
}
