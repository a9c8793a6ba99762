//! Per-member counts and bucketed activity.
//!
//! The [`Aggregator`] is built fresh for every run and owned by the single
//! pass over the event stream. Counts only ever grow. Timed events are kept
//! until the bucket sequence is known, which may depend on the earliest
//! event of the whole run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::classify::Category;
use crate::range::TimeBuckets;

/// `(member, category) -> count`. A missing entry means zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTable {
    counts: BTreeMap<String, BTreeMap<Category, u64>>,
}

impl CountTable {
    pub fn increment(&mut self, user_id: &str, category: Category) {
        self.add(user_id, category, 1);
    }

    fn add(&mut self, user_id: &str, category: Category, n: u64) {
        *self
            .counts
            .entry(user_id.to_string())
            .or_default()
            .entry(category)
            .or_insert(0) += n;
    }

    /// Count for `(user_id, category)`, zero when absent.
    pub fn get(&self, user_id: &str, category: Category) -> u64 {
        self.entry(user_id, category).unwrap_or(0)
    }

    /// Count for `(user_id, category)`, `None` when nothing was recorded.
    pub fn entry(&self, user_id: &str, category: Category) -> Option<u64> {
        self.counts.get(user_id)?.get(&category).copied()
    }

    pub fn user_total(&self, user_id: &str) -> u64 {
        self.counts
            .get(user_id)
            .map(|by_cat| by_cat.values().sum())
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().flat_map(|c| c.values()).sum()
    }

    /// Members with at least one recorded event, in id order.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Number of non-zero `(member, category)` entries.
    pub fn len(&self) -> usize {
        self.counts.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn merge(&mut self, other: CountTable) {
        for (user, by_cat) in other.counts {
            for (category, n) in by_cat {
                self.add(&user, category, n);
            }
        }
    }
}

/// `container -> member -> count`, in container-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerTable {
    counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ContainerTable {
    pub fn increment(&mut self, container: &str, user_id: &str) {
        self.add(container, user_id, 1);
    }

    fn add(&mut self, container: &str, user_id: &str, n: u64) {
        *self
            .counts
            .entry(container.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_insert(0) += n;
    }

    pub fn get(&self, container: &str, user_id: &str) -> u64 {
        self.counts
            .get(container)
            .and_then(|by_user| by_user.get(user_id))
            .copied()
            .unwrap_or(0)
    }

    /// Containers with at least one attributed event, each with its
    /// per-member counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, u64>)> {
        self.counts.iter().map(|(c, by_user)| (c.as_str(), by_user))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn merge(&mut self, other: ContainerTable) {
        for (container, by_user) in other.counts {
            for (user, n) in by_user {
                self.add(&container, &user, n);
            }
        }
    }
}

/// `member -> per-bucket counts`, index-aligned with a [`TimeBuckets`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityHistogram {
    series: BTreeMap<String, Vec<u64>>,
    /// Timed events that fell outside every bucket.
    pub excluded: u64,
}

impl ActivityHistogram {
    pub fn series(&self, user_id: &str) -> Option<&[u64]> {
        self.series.get(user_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.series.iter().map(|(u, s)| (u.as_str(), s.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Accumulates counts and timed events for one run.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: CountTable,
    by_container: ContainerTable,
    timed: HashMap<String, Vec<DateTime<Utc>>>,
    total: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one event for `(user_id, category)`.
    pub fn record(&mut self, user_id: &str, category: Category) {
        self.counts.increment(user_id, category);
        self.total += 1;
    }

    /// Count one event for `user_id` in the container it was posted to.
    /// Does not touch the grand total.
    pub fn record_in(&mut self, container: &str, user_id: &str) {
        self.by_container.increment(container, user_id);
    }

    /// Keep one event timestamp for the activity histogram.
    pub fn record_timed(&mut self, user_id: &str, at: DateTime<Utc>) {
        self.timed.entry(user_id.to_string()).or_default().push(at);
    }

    pub fn counts(&self) -> &CountTable {
        &self.counts
    }

    pub fn by_container(&self) -> &ContainerTable {
        &self.by_container
    }

    /// Grand total of events passed to [`Aggregator::record`].
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the total hit the source's single-page ceiling exactly, which
    /// means the results may have been cut short.
    pub fn page_limit_reached(&self, page_limit: u64) -> bool {
        self.total == page_limit
    }

    /// Fold a partial aggregator (for example one per fetch worker) into
    /// this one. The result is the same as recording both streams here.
    pub fn merge(&mut self, other: Aggregator) {
        self.counts.merge(other.counts);
        self.by_container.merge(other.by_container);
        for (user, mut times) in other.timed {
            self.timed.entry(user).or_default().append(&mut times);
        }
        self.total += other.total;
    }

    /// Bucket every member's timed events.
    ///
    /// Each member's timestamps are sorted first so the scan can resume from
    /// the last matched bucket. Events before the first bucket or at/after
    /// the last bucket's end are dropped from the histogram only.
    pub fn histogram(&mut self, buckets: &TimeBuckets) -> ActivityHistogram {
        let mut histogram = ActivityHistogram::default();
        if buckets.is_empty() {
            histogram.excluded = self.timed.values().map(|t| t.len() as u64).sum();
            return histogram;
        }

        for (user, times) in &mut self.timed {
            times.sort_unstable();
            let mut slots = vec![0u64; buckets.len()];
            let mut idx = 0;
            for (pos, &at) in times.iter().enumerate() {
                while let Some(bucket) = buckets.get(idx) {
                    if at < bucket.end {
                        break;
                    }
                    idx += 1;
                }
                match buckets.get(idx) {
                    Some(bucket) if bucket.start <= at => slots[idx] += 1,
                    Some(_) => histogram.excluded += 1,
                    None => {
                        histogram.excluded += (times.len() - pos) as u64;
                        break;
                    }
                }
            }
            histogram.series.insert(user.clone(), slots);
        }
        histogram
    }

    /// The category and per-container tables.
    pub fn into_tables(self) -> (CountTable, ContainerTable) {
        (self.counts, self.by_container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{EffectiveRange, RangeBuilder};
    use chrono::{Duration, TimeZone};

    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 11, 5, 0, 0, 0).unwrap()
    }

    fn two_days() -> TimeBuckets {
        RangeBuilder::from_hours(24).unwrap().buckets(&EffectiveRange {
            oldest: day0(),
            latest: day0() + Duration::hours(48),
        })
    }

    #[test]
    fn record_counts_each_event_once() {
        let mut agg = Aggregator::new();
        for _ in 0..5 {
            agg.record("U1", Category::General);
        }
        agg.record("U1", Category::Standup);

        assert_eq!(agg.counts().get("U1", Category::General), 5);
        assert_eq!(agg.counts().get("U1", Category::Standup), 1);
        assert_eq!(agg.counts().entry("U2", Category::General), None);
        assert_eq!(agg.counts().get("U2", Category::General), 0);
        assert_eq!(agg.total(), 6);
        assert_eq!(agg.counts().user_total("U1"), 6);
    }

    #[test]
    fn unrecorded_category_is_absent() {
        let mut agg = Aggregator::new();
        agg.record("U1", Category::General);
        assert_eq!(agg.counts().entry("U1", Category::Standup), None);
        assert_eq!(agg.counts().len(), 1);
    }

    #[test]
    fn container_counts_stay_out_of_the_total() {
        let mut agg = Aggregator::new();
        agg.record("U1", Category::General);
        agg.record_in("general", "U1");
        agg.record("U1", Category::General);
        agg.record_in("random", "U1");

        assert_eq!(agg.total(), 2);
        assert_eq!(agg.by_container().get("general", "U1"), 1);
        assert_eq!(agg.by_container().get("random", "U1"), 1);
        assert_eq!(agg.by_container().get("random", "U2"), 0);
        let containers: Vec<&str> = agg.by_container().iter().map(|(c, _)| c).collect();
        assert_eq!(containers, vec!["general", "random"]);
    }

    #[test]
    fn page_limit_exact_match_only() {
        let mut agg = Aggregator::new();
        for _ in 0..999 {
            agg.record("U1", Category::General);
        }
        assert!(!agg.page_limit_reached(1000));
        agg.record("U2", Category::General);
        assert!(agg.page_limit_reached(1000));
        agg.record("U2", Category::General);
        assert!(!agg.page_limit_reached(1000));
    }

    #[test]
    fn histogram_sorts_before_bucketing() {
        let mut agg = Aggregator::new();
        agg.record_timed("U1", day0() + Duration::hours(30));
        agg.record_timed("U1", day0() + Duration::hours(1));
        agg.record_timed("U1", day0() + Duration::hours(24));
        agg.record_timed("U1", day0() + Duration::hours(2));

        let hist = agg.histogram(&two_days());
        assert_eq!(hist.series("U1"), Some(&[2, 2][..]));
        assert_eq!(hist.excluded, 0);
    }

    #[test]
    fn histogram_excludes_out_of_range_events() {
        let mut agg = Aggregator::new();
        agg.record_timed("U1", day0() - Duration::seconds(1));
        agg.record_timed("U1", day0());
        agg.record_timed("U1", day0() + Duration::hours(48));
        agg.record_timed("U1", day0() + Duration::hours(72));

        let hist = agg.histogram(&two_days());
        assert_eq!(hist.series("U1"), Some(&[1, 0][..]));
        assert_eq!(hist.excluded, 3);
    }

    #[test]
    fn histogram_series_are_aligned_across_users() {
        let mut agg = Aggregator::new();
        agg.record_timed("U1", day0() + Duration::hours(3));
        agg.record_timed("U2", day0() + Duration::hours(40));

        let hist = agg.histogram(&two_days());
        assert_eq!(hist.len(), 2);
        for (_, series) in hist.iter() {
            assert_eq!(series.len(), 2);
        }
        assert_eq!(hist.series("U2"), Some(&[0, 1][..]));
    }

    #[test]
    fn empty_buckets_give_empty_histogram() {
        let mut agg = Aggregator::new();
        agg.record("U1", Category::General);
        agg.record_timed("U1", day0());

        let buckets = RangeBuilder::from_hours(24).unwrap().buckets(&EffectiveRange {
            oldest: day0(),
            latest: day0(),
        });
        let hist = agg.histogram(&buckets);
        assert!(hist.is_empty());
        assert_eq!(hist.excluded, 1);
        assert_eq!(agg.counts().get("U1", Category::General), 1);
    }

    #[test]
    fn merge_matches_single_pass() {
        let mut single = Aggregator::new();
        let mut left = Aggregator::new();
        let mut right = Aggregator::new();

        for (i, user) in ["U1", "U2", "U1", "U3"].iter().enumerate() {
            let at = day0() + Duration::hours(i as i64 * 7);
            single.record(user, Category::General);
            single.record_timed(user, at);
            let part = if i % 2 == 0 { &mut left } else { &mut right };
            single.record_in("general", user);
            part.record(user, Category::General);
            part.record_timed(user, at);
            part.record_in("general", user);
        }
        left.merge(right);

        assert_eq!(left.total(), single.total());
        assert_eq!(left.counts(), single.counts());
        assert_eq!(left.by_container(), single.by_container());
        assert_eq!(left.by_container().get("general", "U1"), 2);
        assert_eq!(left.histogram(&two_days()), single.histogram(&two_days()));
    }
}
