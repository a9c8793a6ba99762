//! Effective date range and fixed-width time buckets.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Half-open window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeBucket {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Bounds the audit actually covers once unset ends are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRange {
    pub oldest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Contiguous, strictly increasing buckets of one fixed width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBuckets {
    increment_secs: i64,
    buckets: Vec<TimeBucket>,
}

impl TimeBuckets {
    pub fn increment(&self) -> Duration {
        Duration::seconds(self.increment_secs)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimeBucket> {
        self.buckets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeBucket> {
        self.buckets.iter()
    }

    pub fn starts(&self) -> Vec<DateTime<Utc>> {
        self.buckets.iter().map(|b| b.start).collect()
    }

    /// `[first.start, last.end)`, or `None` when there are no buckets.
    pub fn span(&self) -> Option<TimeBucket> {
        match (self.buckets.first(), self.buckets.last()) {
            (Some(first), Some(last)) => Some(TimeBucket {
                start: first.start,
                end: last.end,
            }),
            _ => None,
        }
    }

    /// Index of the bucket containing `at`.
    pub fn locate(&self, at: DateTime<Utc>) -> Option<usize> {
        let idx = self.buckets.partition_point(|b| b.start <= at);
        if idx == 0 {
            return None;
        }
        let candidate = idx - 1;
        self.buckets[candidate].contains(at).then_some(candidate)
    }
}

/// Derives the effective range and its bucket sequence.
#[derive(Debug, Clone, Copy)]
pub struct RangeBuilder {
    increment: Duration,
}

impl Default for RangeBuilder {
    /// Daily buckets.
    fn default() -> Self {
        Self {
            increment: Duration::hours(24),
        }
    }
}

impl RangeBuilder {
    pub fn new(increment: Duration) -> Result<Self, ConfigError> {
        if increment <= Duration::zero() {
            return Err(ConfigError::InvalidValue {
                key: "increment".into(),
                message: "must be a positive duration".into(),
            });
        }
        Ok(Self { increment })
    }

    pub fn from_hours(hours: u32) -> Result<Self, ConfigError> {
        Self::new(Duration::hours(i64::from(hours)))
    }

    pub fn increment(&self) -> Duration {
        self.increment
    }

    /// Fill in unset bounds.
    ///
    /// An unset `oldest` becomes the earliest observed event (or `now` when
    /// nothing was observed); an unset `latest` becomes `now`.
    pub fn effective_range(
        oldest: Option<DateTime<Utc>>,
        latest: Option<DateTime<Utc>>,
        min_observed: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> EffectiveRange {
        EffectiveRange {
            oldest: oldest.or(min_observed).unwrap_or(now),
            latest: latest.unwrap_or(now),
        }
    }

    /// Buckets starting at `range.oldest`, stepping by the increment until a
    /// start reaches `range.latest`. Empty when `oldest >= latest`.
    pub fn buckets(&self, range: &EffectiveRange) -> TimeBuckets {
        let mut buckets = Vec::new();
        let mut start = range.oldest;
        while start < range.latest {
            let Some(end) = start.checked_add_signed(self.increment) else {
                break;
            };
            buckets.push(TimeBucket { start, end });
            start = end;
        }
        TimeBuckets {
            increment_secs: self.increment.num_seconds(),
            buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 11, 5, 0, 0, 0).unwrap()
    }

    fn range(oldest: DateTime<Utc>, latest: DateTime<Utc>) -> EffectiveRange {
        EffectiveRange { oldest, latest }
    }

    #[test]
    fn unset_bounds_use_min_observed_and_now() {
        let now = day0() + Duration::days(30);
        let t1 = day0() + Duration::hours(3);

        let r = RangeBuilder::effective_range(None, None, Some(t1), now);
        assert_eq!(r.oldest, t1);
        assert_eq!(r.latest, now);

        let r = RangeBuilder::effective_range(Some(day0()), None, Some(t1), now);
        assert_eq!(r.oldest, day0());

        let r = RangeBuilder::effective_range(None, None, None, now);
        assert_eq!(r.oldest, now);
        assert_eq!(r.latest, now);
    }

    #[test]
    fn two_day_range_gives_two_daily_buckets() {
        let builder = RangeBuilder::from_hours(24).unwrap();
        let buckets = builder.buckets(&range(day0(), day0() + Duration::hours(48)));

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.get(0).unwrap().start, day0());
        assert_eq!(buckets.get(0).unwrap().end, day0() + Duration::hours(24));
        assert_eq!(buckets.get(1).unwrap().start, day0() + Duration::hours(24));
        assert_eq!(buckets.get(1).unwrap().end, day0() + Duration::hours(48));
    }

    #[test]
    fn boundary_timestamp_belongs_to_later_bucket() {
        let builder = RangeBuilder::from_hours(24).unwrap();
        let buckets = builder.buckets(&range(day0(), day0() + Duration::hours(48)));

        assert_eq!(buckets.locate(day0()), Some(0));
        assert_eq!(buckets.locate(day0() + Duration::hours(24)), Some(1));
        assert_eq!(buckets.locate(day0() - Duration::seconds(1)), None);
        assert_eq!(buckets.locate(day0() + Duration::hours(48)), None);
    }

    #[test]
    fn partial_last_bucket_extends_past_latest() {
        let builder = RangeBuilder::from_hours(24).unwrap();
        let buckets = builder.buckets(&range(day0(), day0() + Duration::hours(30)));

        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets.span().unwrap().end,
            day0() + Duration::hours(48)
        );
    }

    #[test]
    fn inverted_or_empty_range_has_no_buckets() {
        let builder = RangeBuilder::from_hours(6).unwrap();
        assert!(builder.buckets(&range(day0(), day0())).is_empty());
        assert!(builder
            .buckets(&range(day0() + Duration::hours(1), day0()))
            .is_empty());
        assert!(builder.buckets(&range(day0(), day0())).span().is_none());
    }

    #[test]
    fn zero_increment_is_rejected() {
        assert!(RangeBuilder::from_hours(0).is_err());
        assert!(RangeBuilder::new(Duration::seconds(-5)).is_err());
    }

    #[test]
    fn buckets_are_contiguous() {
        let builder = RangeBuilder::from_hours(5).unwrap();
        let buckets = builder.buckets(&range(day0(), day0() + Duration::days(3)));
        for pair in buckets.iter().collect::<Vec<_>>().windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[1].start);
        }
        assert_eq!(buckets.increment(), Duration::hours(5));
    }
}
