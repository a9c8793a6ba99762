//! Slack source -- channel history attributed to workspace members.
//!
//! Reference: https://api.slack.com/methods

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::http::{Auth, BlockingClient};
use super::{Container, EventPage, EventSource, FetchWindow, RawEvent};
use crate::directory::{Group, Member};
use crate::error::SourceError;

const LIST_PAGE_SIZE: usize = 200;

pub struct SlackSource {
    token: String,
    http: BlockingClient,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct UsersList {
    members: Vec<SlackUser>,
}

#[derive(Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Deserialize, Default)]
struct SlackProfile {
    #[serde(default)]
    real_name: Option<String>,
}

impl SlackUser {
    fn display_name(&self) -> String {
        [self.profile.real_name.as_deref(), self.real_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or(self.name.as_str())
            .to_string()
    }
}

#[derive(Deserialize)]
struct UsergroupsList {
    usergroups: Vec<SlackUsergroup>,
}

#[derive(Deserialize)]
struct SlackUsergroup {
    name: String,
    #[serde(default)]
    users: Vec<String>,
}

#[derive(Deserialize)]
struct ConversationsList {
    channels: Vec<SlackChannel>,
}

#[derive(Deserialize)]
struct SlackChannel {
    id: String,
    name: String,
    #[serde(default)]
    is_global_shared: bool,
}

#[derive(Deserialize)]
struct History {
    messages: Vec<SlackMessage>,
}

#[derive(Deserialize)]
struct SlackMessage {
    #[serde(default)]
    user: Option<String>,
    /// Set on messages posted by an integration on someone's behalf.
    #[serde(default)]
    username: Option<String>,
    ts: String,
}

/// Parse a Slack message timestamp (`"1573000000.000200"`, epoch seconds).
pub fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().take(6).collect();
        format!("{digits:0<6}").parse().ok()?
    };
    DateTime::from_timestamp(secs, micros * 1_000)
}

impl SlackSource {
    pub fn new(token: &str, base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            token: token.to_string(),
            http: BlockingClient::new(base_url)?,
        })
    }

    /// Call a Web API method, unwrapping Slack's `ok`/`error` envelope.
    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Option<String>), SourceError> {
        let body: serde_json::Value = self
            .http
            .get_json(method, query, Auth::Bearer(&self.token))?;

        let envelope: Envelope = serde_json::from_value(body.clone())
            .map_err(|e| SourceError::decode(method, e.to_string()))?;
        if !envelope.ok {
            return Err(SourceError::Api {
                endpoint: method.to_string(),
                message: envelope.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        let next_cursor = envelope
            .response_metadata
            .map(|m| m.next_cursor)
            .filter(|c| !c.is_empty());

        let payload =
            serde_json::from_value(body).map_err(|e| SourceError::decode(method, e.to_string()))?;
        Ok((payload, next_cursor))
    }

    /// Follow `next_cursor` until the listing is exhausted.
    fn call_all<T: DeserializeOwned, I>(
        &self,
        method: &str,
        query: &[(&str, String)],
        mut items: impl FnMut(T) -> Vec<I>,
    ) -> Result<Vec<I>, SourceError> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = query.to_vec();
            params.push(("limit", LIST_PAGE_SIZE.to_string()));
            if let Some(c) = cursor.take() {
                params.push(("cursor", c));
            }
            let (page, next) = self.call::<T>(method, &params)?;
            out.extend(items(page));
            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(out),
            }
        }
    }
}

impl EventSource for SlackSource {
    fn name(&self) -> &str {
        "slack"
    }

    fn list_members(&self) -> Result<Vec<Member>, SourceError> {
        self.call_all("users.list", &[], |page: UsersList| {
            page.members
                .into_iter()
                .map(|u| {
                    let display = u.display_name();
                    Member::new(u.id, display)
                })
                .collect()
        })
    }

    fn list_groups(&self) -> Result<Vec<Group>, SourceError> {
        let (list, _) = self.call::<UsergroupsList>(
            "usergroups.list",
            &[("include_users", "true".to_string())],
        )?;
        Ok(list
            .usergroups
            .into_iter()
            .map(|g| Group::new(g.name, g.users))
            .collect())
    }

    fn list_containers(&self) -> Result<Vec<Container>, SourceError> {
        self.call_all(
            "conversations.list",
            &[("types", "public_channel,private_channel".to_string())],
            |page: ConversationsList| {
                page.channels
                    .into_iter()
                    .map(|c| Container {
                        id: c.id,
                        name: c.name,
                        is_global_shared: c.is_global_shared,
                    })
                    .collect()
            },
        )
    }

    fn list_events(
        &self,
        container: &Container,
        window: &FetchWindow,
    ) -> Result<EventPage, SourceError> {
        let mut query = vec![
            ("channel", container.id.clone()),
            ("limit", window.page_limit.to_string()),
        ];
        if let Some(oldest) = window.oldest {
            query.push(("oldest", oldest.timestamp().to_string()));
        }
        if let Some(latest) = window.latest {
            query.push(("latest", latest.timestamp().to_string()));
        }

        let (history, _) = self.call::<History>("conversations.history", &query)?;
        let fetched = history.messages.len();
        let events = history
            .messages
            .into_iter()
            .filter_map(|m| {
                let Some(timestamp) = parse_ts(&m.ts) else {
                    debug!(
                        channel = %container.name,
                        ts = %m.ts,
                        "skipping message with unparseable ts"
                    );
                    return None;
                };
                Some(RawEvent {
                    creator_id: m.user,
                    creator_name_hint: m.username,
                    container_id: container.id.clone(),
                    container_name: container.name.clone(),
                    timestamp,
                })
            })
            .collect();
        Ok(EventPage { events, fetched })
    }
}
