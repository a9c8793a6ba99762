//! Event sources.
//!
//! A source lists the member directory, the containers (channels or boards)
//! and, per container, one bounded page of raw events. Sources are stateless
//! between calls and are driven sequentially by [`crate::audit::run`].

mod http;
mod memory;
pub mod slack;
pub mod trello;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::{Group, Member};
use crate::error::SourceError;
use crate::report::Notice;

pub use memory::StaticSource;
pub use slack::SlackSource;
pub use trello::TrelloSource;

/// A channel or board that holds events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    /// Organization-wide shared container.
    #[serde(default)]
    pub is_global_shared: bool,
}

impl Container {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_global_shared: false,
        }
    }

    pub fn shared(mut self) -> Self {
        self.is_global_shared = true;
        self
    }
}

/// One activity record as delivered by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub creator_id: Option<String>,
    /// Free-text creator label for relayed events.
    pub creator_name_hint: Option<String>,
    pub container_id: String,
    pub container_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounds and page size for one events request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub oldest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub page_limit: usize,
}

/// One page of decoded events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    /// Records the service returned, including any dropped while decoding.
    pub fetched: usize,
}

impl EventPage {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            fetched: events.len(),
            events,
        }
    }

    /// The service returned a full page, so older records may be missing.
    pub fn is_full(&self, page_limit: usize) -> bool {
        self.fetched >= page_limit
    }
}

/// A service that activity can be audited from.
pub trait EventSource {
    /// Short identifier used in logs (e.g. "slack").
    fn name(&self) -> &str;

    fn list_members(&self) -> Result<Vec<Member>, SourceError>;

    /// Groups for report grouping. Sources without groups return none.
    fn list_groups(&self) -> Result<Vec<Group>, SourceError> {
        Ok(Vec::new())
    }

    fn list_containers(&self) -> Result<Vec<Container>, SourceError>;

    /// At most `window.page_limit` events from `container`.
    fn list_events(
        &self,
        container: &Container,
        window: &FetchWindow,
    ) -> Result<EventPage, SourceError>;

    /// Non-fatal conditions met while setting the source up.
    fn notices(&self) -> Vec<Notice> {
        Vec::new()
    }
}
