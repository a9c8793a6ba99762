//! Member and group directory.
//!
//! Loaded once per run from the event source and read-only afterwards.
//! Name lookups are exact string matches against each member's display
//! name; a miss is `None`, never an error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A team member as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub display_name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A named set of members, used only to group the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub member_ids: BTreeSet<String>,
}

impl Group {
    pub fn new<I, S>(name: impl Into<String>, member_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            member_ids: member_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Lookup tables for members and groups.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    members: Vec<Member>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    groups: Vec<Group>,
}

impl UserDirectory {
    /// Build the directory from the full member and group lists.
    ///
    /// When two members share a display name the later one wins the name
    /// lookup, matching a plain overwrite of the reverse map.
    pub fn new(members: Vec<Member>, groups: Vec<Group>) -> Self {
        let mut by_id = HashMap::with_capacity(members.len());
        let mut by_name = HashMap::with_capacity(members.len());
        for (idx, member) in members.iter().enumerate() {
            by_id.insert(member.id.clone(), idx);
            by_name.insert(member.display_name.clone(), idx);
        }
        Self {
            members,
            by_id,
            by_name,
            groups,
        }
    }

    /// Resolve a display name to a member id.
    pub fn resolve_id(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&idx| self.members[idx].id.as_str())
    }

    /// Display name for a member id, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.member(id)
            .map(|m| m.display_name.as_str())
            .unwrap_or(id)
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.by_id.get(id).map(|&idx| &self.members[idx])
    }

    /// Member ids of a group, in id order. `None` when the group is unknown.
    pub fn group_members(&self, group_name: &str) -> Option<Vec<&str>> {
        self.groups
            .iter()
            .find(|g| g.name == group_name)
            .map(|g| g.member_ids.iter().map(String::as_str).collect())
    }

    /// Groups in the order the source listed them.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
