//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by subtracting the specified number of minutes.
    pub fn minus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 - Duration::minutes(minutes))
    }

    /// Whole and fractional minutes elapsed between this timestamp and `now`.
    pub fn age_minutes(&self, now: &Timestamp) -> f64 {
        now.duration_since(self).num_milliseconds() as f64 / 60_000.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_minutes_moves_backwards() {
        let now = Timestamp::now();
        let earlier = now.minus_minutes(30);
        assert_eq!(now.duration_since(&earlier).num_minutes(), 30);
    }

    #[test]
    fn age_minutes_is_fractional() {
        let now = Timestamp::now();
        let earlier = Timestamp::from_datetime(*now.as_datetime() - Duration::seconds(90));
        let age = earlier.age_minutes(&now);
        assert!((age - 1.5).abs() < 1e-9);
    }
}
