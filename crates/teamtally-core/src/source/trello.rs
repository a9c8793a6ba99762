//! Trello source -- actions on a single board.
//!
//! Reference: https://developers.trello.com/reference

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::http::{Auth, BlockingClient};
use super::{Container, EventPage, EventSource, FetchWindow, RawEvent};
use crate::directory::Member;
use crate::error::{CoreError, SourceError};
use crate::report::Notice;

/// Trello API key and user token, sent as query parameters.
#[derive(Debug, Clone)]
pub struct TrelloCredentials {
    pub key: String,
    pub token: String,
}

impl TrelloCredentials {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("key", self.key.clone()), ("token", self.token.clone())]
    }
}

pub struct TrelloSource {
    credentials: TrelloCredentials,
    http: BlockingClient,
    board: Container,
    /// Team name given to `connect` that matched no organization.
    missing_team: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Me {
    #[serde(default)]
    id_organizations: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organization {
    #[serde(default)]
    display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Board {
    id: String,
    name: String,
    #[serde(default)]
    id_organization: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardMember {
    id: String,
    full_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Action {
    #[serde(default)]
    id_member_creator: Option<String>,
    #[serde(default)]
    member_creator: Option<MemberCreator>,
    date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberCreator {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
}

impl TrelloSource {
    /// Resolve `board_name` (optionally within the team named `team`) and
    /// return a source bound to it.
    ///
    /// An unknown team is logged and the search falls back to all boards;
    /// an unknown board is fatal. When several boards share the name, the
    /// last one listed wins.
    pub fn connect(
        credentials: TrelloCredentials,
        board_name: &str,
        team: Option<&str>,
        base_url: &str,
    ) -> Result<Self, CoreError> {
        let http = BlockingClient::new(base_url)?;

        let mut missing_team = None;
        let org_id = match team {
            Some(team) => {
                let found = find_organization(&http, &credentials, team)?;
                if found.is_none() {
                    warn!(team, "team not found, searching all boards");
                    missing_team = Some(team.to_string());
                }
                found
            }
            None => None,
        };

        let boards: Vec<Board> =
            http.get_json("members/me/boards", &credentials.query(), Auth::None)?;
        let board = boards
            .into_iter()
            .filter(|b| match &org_id {
                Some(org) => b.id_organization.as_deref() == Some(org.as_str()),
                None => true,
            })
            .filter(|b| b.name == board_name)
            .last()
            .ok_or_else(|| CoreError::BoardNotFound {
                board: board_name.to_string(),
                team: team.map(str::to_string),
            })?;

        debug!(board = %board.name, id = %board.id, "resolved board");
        Ok(Self {
            credentials,
            http,
            board: Container::new(board.id, board.name),
            missing_team,
        })
    }

    pub fn board(&self) -> &Container {
        &self.board
    }
}

fn find_organization(
    http: &BlockingClient,
    credentials: &TrelloCredentials,
    team: &str,
) -> Result<Option<String>, SourceError> {
    let me: Me = http.get_json("members/me", &credentials.query(), Auth::None)?;
    for org_id in me.id_organizations {
        let endpoint = format!("organizations/{org_id}");
        match http.get_json::<Organization>(&endpoint, &credentials.query(), Auth::None) {
            Ok(org) if org.display_name == team => return Ok(Some(org_id)),
            Ok(_) => {}
            Err(e) => warn!(organization = %org_id, error = %e, "skipping organization"),
        }
    }
    Ok(None)
}

impl EventSource for TrelloSource {
    fn name(&self) -> &str {
        "trello"
    }

    fn list_members(&self) -> Result<Vec<Member>, SourceError> {
        let endpoint = format!("boards/{}/members", self.board.id);
        let members: Vec<BoardMember> =
            self.http
                .get_json(&endpoint, &self.credentials.query(), Auth::None)?;
        Ok(members
            .into_iter()
            .map(|m| Member::new(m.id, m.full_name))
            .collect())
    }

    fn list_containers(&self) -> Result<Vec<Container>, SourceError> {
        Ok(vec![self.board.clone()])
    }

    fn list_events(
        &self,
        container: &Container,
        window: &FetchWindow,
    ) -> Result<EventPage, SourceError> {
        let endpoint = format!("boards/{}/actions", container.id);
        let mut query = self.credentials.query();
        query.push(("limit", window.page_limit.to_string()));
        if let Some(oldest) = window.oldest {
            query.push(("since", oldest.to_rfc3339()));
        }
        if let Some(latest) = window.latest {
            query.push(("before", latest.to_rfc3339()));
        }

        let actions: Vec<Action> = self.http.get_json(&endpoint, &query, Auth::None)?;
        let fetched = actions.len();
        let events = actions
            .into_iter()
            .filter_map(|a| {
                let timestamp = match DateTime::parse_from_rfc3339(&a.date) {
                    Ok(ts) => ts.with_timezone(&Utc),
                    Err(_) => {
                        debug!(
                            board = %container.name,
                            date = %a.date,
                            "skipping action with unparseable date"
                        );
                        return None;
                    }
                };
                let (creator_id, hint) = match a.member_creator {
                    Some(mc) => (a.id_member_creator.or(mc.id), mc.full_name),
                    None => (a.id_member_creator, None),
                };
                Some(RawEvent {
                    creator_id,
                    creator_name_hint: hint,
                    container_id: container.id.clone(),
                    container_name: container.name.clone(),
                    timestamp,
                })
            })
            .collect();
        Ok(EventPage { events, fetched })
    }

    fn notices(&self) -> Vec<Notice> {
        self.missing_team
            .iter()
            .map(|team| Notice::UnknownTeam { team: team.clone() })
            .collect()
    }
}
