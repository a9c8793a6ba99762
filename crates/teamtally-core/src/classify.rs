//! Container-based event classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::Container;

pub const DEFAULT_STANDUP_MARKER: &str = "virtual-standup";

/// Category an event is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Standup,
    General,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::General, Category::Standup];

    /// Heading used in the text report.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Standup => "Virtual-Standups",
            Category::General => "Non-Standups",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Standup => "standup",
            Category::General => "general",
        })
    }
}

/// Assigns categories from container metadata alone.
#[derive(Debug, Clone)]
pub struct Classifier {
    marker: String,
    skip_global_shared: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_STANDUP_MARKER, true)
    }
}

impl Classifier {
    pub fn new(marker: impl Into<String>, skip_global_shared: bool) -> Self {
        Self {
            marker: marker.into(),
            skip_global_shared,
        }
    }

    /// Whether events from `container` take part in the audit at all.
    ///
    /// Organization-wide shared containers are filtered here, before
    /// classification.
    pub fn admits(&self, container: &Container) -> bool {
        !(self.skip_global_shared && container.is_global_shared)
    }

    pub fn classify(&self, container_name: &str) -> Category {
        if !self.marker.is_empty() && container_name.contains(&self.marker) {
            Category::Standup
        } else {
            Category::General
        }
    }
}
