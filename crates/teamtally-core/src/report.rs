//! Audit results and their text/chart renderings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::aggregate::{ActivityHistogram, ContainerTable, CountTable};
use crate::attribution::AttributionMiss;
use crate::classify::Category;
use crate::directory::Group;
use crate::error::CoreError;
use crate::range::{EffectiveRange, TimeBuckets};

/// Something skipped during a run. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// An event could not be attributed and was dropped.
    Attribution {
        container: String,
        miss: AttributionMiss,
    },
    /// A container's events could not be fetched; it was skipped.
    FetchFailure { container: String, message: String },
    /// A group lists a member id the directory does not know.
    UnknownMember { group: String, user_id: String },
    /// The requested team matched no organization; all boards were searched.
    UnknownTeam { team: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Attribution { container, miss } => write!(f, "{container}: {miss}"),
            Notice::FetchFailure { container, message } => {
                write!(f, "Error in {container}: {message}")
            }
            Notice::UnknownMember { group, user_id } => {
                write!(f, "{group}: member {user_id} not found")
            }
            Notice::UnknownTeam { team } => {
                write!(f, "Cannot find team {team}, searched all boards")
            }
        }
    }
}

/// Everything one audit run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub source: String,
    pub range: EffectiveRange,
    pub buckets: TimeBuckets,
    pub counts: CountTable,
    /// Attributed events per container and member.
    pub by_container: ContainerTable,
    pub histogram: ActivityHistogram,
    pub groups: Vec<Group>,
    /// Display names by member id.
    pub names: BTreeMap<String, String>,
    pub notices: Vec<Notice>,
    pub total: u64,
    pub page_limit: usize,
    /// The grand total equals the page ceiling; results may be truncated.
    pub page_limit_reached: bool,
    /// Containers whose single fetch returned a full page.
    pub saturated_containers: Vec<String>,
}

impl AuditReport {
    pub fn display_name<'a>(&'a self, user_id: &'a str) -> &'a str {
        self.names.get(user_id).map(String::as_str).unwrap_or(user_id)
    }

    pub fn truncation_warning(&self) -> Option<String> {
        self.page_limit_reached.then(|| {
            format!(
                "Maximum total contributions reached ({}) consider providing an oldest and latest date",
                self.page_limit
            )
        })
    }

    /// Per-group (or, without groups, per-member) counts for every category,
    /// followed by notices and the total.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        if self.groups.is_empty() {
            for category in Category::ALL {
                let mut rows: Vec<(&str, u64)> = self
                    .counts
                    .users()
                    .filter_map(|u| {
                        let n = self.counts.entry(u, category)?;
                        Some((self.display_name(u), n))
                    })
                    .collect();
                if rows.is_empty() {
                    continue;
                }
                rows.sort();
                out.push_str(&format!("{}:\n", category.label()));
                for (name, n) in rows {
                    out.push_str(&format!("\t{name}: {n}\n"));
                }
            }
        } else {
            for group in &self.groups {
                for category in Category::ALL {
                    out.push_str(&format!("{} - {}:\n", group.name, category.label()));
                    for user in &group.member_ids {
                        if let Some(n) = self.counts.entry(user, category) {
                            out.push_str(&format!("\t{}: {n}\n", self.display_name(user)));
                        }
                    }
                }
            }
        }

        if !self.notices.is_empty() {
            out.push_str("\nNotices:\n");
            for notice in &self.notices {
                out.push_str(&format!("\t{notice}\n"));
            }
        }

        if !self.saturated_containers.is_empty() {
            out.push_str(&format!(
                "\nFull page ({}) returned for: {}\n",
                self.page_limit,
                self.saturated_containers.join(", ")
            ));
        }

        match self.truncation_warning() {
            Some(warning) => out.push_str(&format!("\n{warning}\n")),
            None => out.push_str(&format!("\nTotal contributions: {}\n", self.total)),
        }
        out
    }

    /// `"{container}:"` followed by one `"\t{name}: {count}"` line per
    /// member, members in display-name order.
    pub fn render_by_container(&self) -> String {
        let mut out = String::new();
        for (container, by_user) in self.by_container.iter() {
            out.push_str(&format!("{container}:\n"));
            let mut rows: Vec<(&str, u64)> = by_user
                .iter()
                .map(|(u, &n)| (self.display_name(u), n))
                .collect();
            rows.sort();
            for (name, n) in rows {
                out.push_str(&format!("\t{name}: {n}\n"));
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Histogram series keyed by display name, in display-name order.
    pub fn chart_series(&self) -> Vec<(String, Vec<u64>)> {
        let mut series: Vec<(String, Vec<u64>)> = self
            .histogram
            .iter()
            .map(|(user, counts)| (self.display_name(user).to_string(), counts.to_vec()))
            .collect();
        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }

    pub fn draw_chart(&self, sink: &mut dyn ChartSink) -> Result<(), CoreError> {
        sink.draw(&self.buckets.starts(), &self.chart_series())
    }
}

/// Consumer of bucketed activity, e.g. a plotting backend.
pub trait ChartSink {
    /// `series` entries are index-aligned with `bucket_starts`.
    fn draw(
        &mut self,
        bucket_starts: &[DateTime<Utc>],
        series: &[(String, Vec<u64>)],
    ) -> Result<(), CoreError>;
}

/// Text chart: one row of shaded cells per member, one cell per bucket.
#[derive(Debug, Default)]
pub struct AsciiChart {
    output: String,
}

impl AsciiChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn into_string(self) -> String {
        self.output
    }

    fn cell(count: u64) -> char {
        match count {
            0 => '·',
            1 => '░',
            2..=5 => '▒',
            6..=10 => '▓',
            _ => '█',
        }
    }
}

impl ChartSink for AsciiChart {
    fn draw(
        &mut self,
        bucket_starts: &[DateTime<Utc>],
        series: &[(String, Vec<u64>)],
    ) -> Result<(), CoreError> {
        if let Some((name, s)) = series.iter().find(|(_, s)| s.len() != bucket_starts.len()) {
            return Err(CoreError::Chart(format!(
                "series for {name} has {} points, expected {}",
                s.len(),
                bucket_starts.len()
            )));
        }

        let out = &mut self.output;
        out.push_str("\nActivity\n");
        out.push_str(&"=".repeat(80));
        out.push('\n');

        let (Some(first), Some(last)) = (bucket_starts.first(), bucket_starts.last()) else {
            out.push_str("No activity buckets in range.\n");
            return Ok(());
        };
        if series.is_empty() {
            out.push_str("No activity data available.\n");
            return Ok(());
        }

        let width = series.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0);
        for (name, counts) in series {
            let row: String = counts.iter().map(|&c| Self::cell(c)).collect();
            let total: u64 = counts.iter().sum();
            out.push_str(&format!("{name:<width$}  {row}  {total}\n"));
        }

        out.push('\n');
        out.push_str(&format!(
            "{} buckets from {} to {}\n",
            bucket_starts.len(),
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M"),
        ));
        out.push_str("Legend: · (0) ░ (1) ▒ (2-5) ▓ (6-10) █ (11+)\n");
        Ok(())
    }
}
