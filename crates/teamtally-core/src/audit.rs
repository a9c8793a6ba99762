//! The audit pipeline.
//!
//! One synchronous pass: load the directory, walk the containers in order,
//! fetch one page of events per container, attribute, classify and record
//! each event, then derive the time range and bucket the recorded activity.
//! All state lives in values created inside [`run`]; nothing outlives it
//! except the returned [`AuditReport`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::attribution::AttributionResolver;
use crate::config::AuditConfig;
use crate::directory::UserDirectory;
use crate::error::Result;
use crate::range::RangeBuilder;
use crate::report::{AuditReport, Notice};
use crate::source::{EventSource, FetchWindow};

/// Run one audit against `source`.
///
/// `now` is the run-start time used for an unset `latest` bound.
///
/// # Errors
///
/// Fails only when the directory or the container list cannot be loaded.
/// Per-container fetch failures and attribution misses become notices.
pub fn run<S>(source: &S, config: &AuditConfig, now: DateTime<Utc>) -> Result<AuditReport>
where
    S: EventSource + ?Sized,
{
    let directory = UserDirectory::new(source.list_members()?, source.list_groups()?);
    debug!(
        source = source.name(),
        members = directory.len(),
        groups = directory.groups().len(),
        "directory loaded"
    );

    let mut notices = source.notices();
    for group in directory.groups() {
        for user_id in &group.member_ids {
            if directory.member(user_id).is_none() {
                warn!(group = %group.name, user_id = %user_id, "group member not in directory");
                notices.push(Notice::UnknownMember {
                    group: group.name.clone(),
                    user_id: user_id.clone(),
                });
            }
        }
    }

    let mut names: BTreeMap<String, String> = directory
        .members()
        .iter()
        .map(|m| (m.id.clone(), m.display_name.clone()))
        .collect();

    let window = FetchWindow {
        oldest: config.oldest,
        latest: config.latest,
        page_limit: config.page_limit,
    };
    let resolver = AttributionResolver::new(&directory);
    let mut aggregator = Aggregator::new();
    let mut min_observed: Option<DateTime<Utc>> = None;
    let mut saturated = Vec::new();

    for container in source.list_containers()? {
        if !config.classifier.admits(&container) {
            debug!(container = %container.name, "skipping shared container");
            continue;
        }

        let page = match source.list_events(&container, &window) {
            Ok(page) => page,
            Err(e) => {
                warn!(container = %container.name, error = %e, "fetch failed, skipping container");
                notices.push(Notice::FetchFailure {
                    container: container.name.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        debug!(
            container = %container.name,
            events = page.events.len(),
            fetched = page.fetched,
            "fetched"
        );
        if page.is_full(config.page_limit) {
            saturated.push(container.name.clone());
        }

        let category = config.classifier.classify(&container.name);
        for event in &page.events {
            min_observed = Some(match min_observed {
                Some(min) => min.min(event.timestamp),
                None => event.timestamp,
            });

            let user_id = match resolver.resolve(event) {
                Ok(user_id) => user_id,
                Err(miss) => {
                    warn!(container = %container.name, "{miss}");
                    notices.push(Notice::Attribution {
                        container: container.name.clone(),
                        miss,
                    });
                    continue;
                }
            };

            if let Some(hint) = &event.creator_name_hint {
                names
                    .entry(user_id.clone())
                    .or_insert_with(|| hint.clone());
            }
            aggregator.record(&user_id, category);
            aggregator.record_in(&container.name, &user_id);
            aggregator.record_timed(&user_id, event.timestamp);
        }
    }

    let range = RangeBuilder::effective_range(config.oldest, config.latest, min_observed, now);
    let buckets = config.range.buckets(&range);
    let histogram = aggregator.histogram(&buckets);
    let total = aggregator.total();
    let page_limit_reached = aggregator.page_limit_reached(config.page_limit as u64);

    info!(
        source = source.name(),
        total,
        buckets = buckets.len(),
        notices = notices.len(),
        "audit complete"
    );
    if page_limit_reached {
        warn!(
            page_limit = config.page_limit,
            "total equals the page ceiling, results may be truncated"
        );
    }

    let (counts, by_container) = aggregator.into_tables();
    Ok(AuditReport {
        source: source.name().to_string(),
        range,
        buckets,
        counts,
        by_container,
        histogram,
        groups: directory.groups().to_vec(),
        names,
        notices,
        total,
        page_limit: config.page_limit,
        page_limit_reached,
        saturated_containers: saturated,
    })
}
