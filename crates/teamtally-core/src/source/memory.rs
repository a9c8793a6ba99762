use std::collections::HashMap;

use super::{Container, EventPage, EventSource, FetchWindow, RawEvent};
use crate::directory::{Group, Member};
use crate::error::SourceError;

/// In-memory source, for offline replays and tests.
///
/// Honors the fetch window the way the HTTP services do: events outside
/// `[oldest, latest)` are filtered and at most `page_limit` are returned.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    members: Vec<Member>,
    groups: Vec<Group>,
    containers: Vec<Container>,
    events: HashMap<String, Vec<RawEvent>>,
    failing: HashMap<String, String>,
}

impl StaticSource {
    pub fn new(members: Vec<Member>, groups: Vec<Group>) -> Self {
        Self {
            members,
            groups,
            ..Self::default()
        }
    }

    pub fn with_container(mut self, container: Container, events: Vec<RawEvent>) -> Self {
        self.events.insert(container.id.clone(), events);
        self.containers.push(container);
        self
    }

    /// Make every events request for `container` fail with `message`.
    pub fn with_failing_container(mut self, container: Container, message: &str) -> Self {
        self.failing.insert(container.id.clone(), message.to_string());
        self.containers.push(container);
        self
    }
}

impl EventSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn list_members(&self) -> Result<Vec<Member>, SourceError> {
        Ok(self.members.clone())
    }

    fn list_groups(&self) -> Result<Vec<Group>, SourceError> {
        Ok(self.groups.clone())
    }

    fn list_containers(&self) -> Result<Vec<Container>, SourceError> {
        Ok(self.containers.clone())
    }

    fn list_events(
        &self,
        container: &Container,
        window: &FetchWindow,
    ) -> Result<EventPage, SourceError> {
        if let Some(message) = self.failing.get(&container.id) {
            return Err(SourceError::Api {
                endpoint: format!("events/{}", container.id),
                message: message.clone(),
            });
        }
        let events = self
            .events
            .get(&container.id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| window.oldest.map_or(true, |o| e.timestamp >= o))
                    .filter(|e| window.latest.map_or(true, |l| e.timestamp < l))
                    .take(window.page_limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(EventPage::new(events))
    }
}
