//! # teamtally Core Library
//!
//! Collects activity events (chat messages, board actions) from a
//! collaboration service, attributes each event to a team member, classifies
//! it by container and produces per-member counts plus time-bucketed
//! histograms over a bounded date range.
//!
//! The CLI binary is a thin layer over this crate: it parses arguments into
//! an [`AuditConfig`], picks an [`EventSource`] and prints the
//! [`AuditReport`].
//!
//! ## Pipeline
//!
//! `EventSource` → [`AttributionResolver`] → [`Classifier`] → [`Aggregator`]
//! → [`RangeBuilder`] buckets → [`AuditReport`] / [`ChartSink`].
//!
//! ## Key Components
//!
//! - [`UserDirectory`]: member names and groups, loaded once per run
//! - [`AttributionResolver`]: maps relayed name labels back to members
//! - [`Classifier`]: standup vs general, by container name
//! - [`Aggregator`]: count table and per-member activity histogram
//! - [`RangeBuilder`]: effective range and fixed-width buckets

pub mod aggregate;
pub mod attribution;
pub mod audit;
pub mod classify;
pub mod config;
pub mod directory;
pub mod error;
pub mod range;
pub mod report;
pub mod source;

pub use aggregate::{ActivityHistogram, Aggregator, ContainerTable, CountTable};
pub use attribution::{candidate_name, AttributionMiss, AttributionResolver};
pub use classify::{Category, Classifier};
pub use config::{AuditConfig, AuditOverrides, Settings};
pub use directory::{Group, Member, UserDirectory};
pub use error::{ConfigError, CoreError, SourceError};
pub use range::{EffectiveRange, RangeBuilder, TimeBucket, TimeBuckets};
pub use report::{AsciiChart, AuditReport, ChartSink, Notice};
pub use source::trello::TrelloCredentials;
pub use source::{
    Container, EventPage, EventSource, FetchWindow, RawEvent, SlackSource, StaticSource,
    TrelloSource,
};
