//! Event attribution.
//!
//! Events carrying a creator id are attributed to it directly. Relayed
//! events (posted by an integration on someone's behalf) only carry a free
//! text label such as `"Jane Doe (standup bot)"`; the label is trimmed to a
//! candidate display name and resolved through the [`UserDirectory`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::directory::UserDirectory;
use crate::source::RawEvent;

/// Why an event could not be attributed to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributionMiss {
    /// No creator id and no name hint.
    MissingHint,
    /// A hint was present but its candidate name is not in the directory.
    Unresolved { hint: String, candidate: String },
}

impl fmt::Display for AttributionMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionMiss::MissingHint => {
                write!(f, "event has neither a creator id nor a name hint")
            }
            AttributionMiss::Unresolved { hint, candidate } => {
                write!(f, "Username: {candidate} not found (hint: {hint:?})")
            }
        }
    }
}

/// Trim a relayed name label down to a candidate display name.
///
/// Cuts at the first `(` and also drops the character just before it, so
/// `"Real Name (role)"` becomes `"Real Name"`. A label without `(` is
/// returned unchanged; a label starting with `(` yields an empty string.
pub fn candidate_name(hint: &str) -> &str {
    match hint.find('(') {
        Some(open) => {
            let head = &hint[..open];
            match head.char_indices().last() {
                Some((last, _)) => &head[..last],
                None => head,
            }
        }
        None => hint,
    }
}

/// Resolves raw events to member ids.
pub struct AttributionResolver<'a> {
    directory: &'a UserDirectory,
}

impl<'a> AttributionResolver<'a> {
    pub fn new(directory: &'a UserDirectory) -> Self {
        Self { directory }
    }

    /// Member id that produced `event`.
    ///
    /// A direct creator id is returned unchanged, without consulting the
    /// directory or the hint.
    pub fn resolve(&self, event: &RawEvent) -> Result<String, AttributionMiss> {
        if let Some(id) = &event.creator_id {
            return Ok(id.clone());
        }
        let hint = event
            .creator_name_hint
            .as_deref()
            .ok_or(AttributionMiss::MissingHint)?;
        let candidate = candidate_name(hint);
        self.directory
            .resolve_id(candidate)
            .map(str::to_string)
            .ok_or_else(|| AttributionMiss::Unresolved {
                hint: hint.to_string(),
                candidate: candidate.to_string(),
            })
    }
}
