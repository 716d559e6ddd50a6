//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for `started_at` and uptime computations.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Elapsed time between `since` and `now`, clamped at zero when the clock
/// went backwards.
#[must_use]
pub fn elapsed(since: Timestamp, now: Timestamp) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_compute_elapsed_duration() {
        let since = now();
        let later = since + chrono::Duration::seconds(90);
        assert_eq!(elapsed(since, later), Duration::from_secs(90));
    }

    #[test]
    fn should_clamp_elapsed_to_zero_when_clock_goes_backwards() {
        let since = now();
        let earlier = since - chrono::Duration::seconds(5);
        assert_eq!(elapsed(since, earlier), Duration::ZERO);
    }
}
