//! Trello source against a mock REST API.

use chrono::{Duration, TimeZone, Utc};
use indoc::indoc;
use mockito::{Matcher, Server, ServerGuard};
use teamtally_core::{
    audit, AuditConfig, Category, CoreError, EventSource, FetchWindow, Notice, TrelloCredentials,
    TrelloSource,
};

const BOARDS: &str = indoc! {r#"
    [
        {"id": "B0", "name": "Sprint", "idOrganization": "O1"},
        {"id": "B1", "name": "Sprint", "idOrganization": "O2"},
        {"id": "B2", "name": "Backlog", "idOrganization": "O2"}
    ]
"#};

const MEMBERS: &str = indoc! {r#"
    [
        {"id": "M1", "fullName": "Alice Ames"},
        {"id": "M2", "fullName": "Bob Roe"}
    ]
"#};

const ACTIONS: &str = indoc! {r#"
    [
        {"idMemberCreator": "M1", "memberCreator": {"id": "M1", "fullName": "Alice Ames"}, "date": "2019-11-05T10:00:00.000Z"},
        {"idMemberCreator": "M1", "date": "2019-11-06T11:00:00.000Z"},
        {"memberCreator": {"id": "M2", "fullName": "Bob Roe"}, "date": "2019-11-05T12:30:00.000Z"},
        {"idMemberCreator": "M9", "memberCreator": {"id": "M9", "fullName": "Former Member"}, "date": "2019-11-06T09:00:00.000Z"},
        {"idMemberCreator": "M2", "date": "yesterday"}
    ]
"#};

fn credentials() -> TrelloCredentials {
    TrelloCredentials {
        key: "k".into(),
        token: "t".into(),
    }
}

fn keyed(extra: Vec<Matcher>) -> Matcher {
    let mut all = vec![
        Matcher::UrlEncoded("key".into(), "k".into()),
        Matcher::UrlEncoded("token".into(), "t".into()),
    ];
    all.extend(extra);
    Matcher::AllOf(all)
}

fn json_mock(server: &mut ServerGuard, path: &str, query: Matcher, body: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_query(query)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

fn team_mocks(server: &mut ServerGuard) -> Vec<mockito::Mock> {
    vec![
        json_mock(server, "/members/me", keyed(vec![]), r#"{"idOrganizations": ["O1", "O2"]}"#),
        json_mock(server, "/organizations/O1", keyed(vec![]), r#"{"displayName": "Other"}"#),
        json_mock(server, "/organizations/O2", keyed(vec![]), r#"{"displayName": "SWEN"}"#),
        json_mock(server, "/members/me/boards", keyed(vec![]), BOARDS),
    ]
}

#[test]
fn test_connect_without_team_takes_last_match() {
    let mut server = Server::new();
    let _boards = json_mock(&mut server, "/members/me/boards", keyed(vec![]), BOARDS);

    let source = TrelloSource::connect(credentials(), "Sprint", None, &server.url()).unwrap();
    assert_eq!(source.board().id, "B1");
    assert_eq!(source.list_containers().unwrap(), vec![source.board().clone()]);
    assert!(source.notices().is_empty());
}

#[test]
fn test_connect_within_team() {
    let mut server = Server::new();
    let _mocks = team_mocks(&mut server);

    let source =
        TrelloSource::connect(credentials(), "Sprint", Some("SWEN"), &server.url()).unwrap();
    assert_eq!(source.board().id, "B1");

    // the team filter runs before the last-match rule
    let source =
        TrelloSource::connect(credentials(), "Sprint", Some("Other"), &server.url()).unwrap();
    assert_eq!(source.board().id, "B0");
}

#[test]
fn test_unknown_team_searches_all_boards() {
    let mut server = Server::new();
    let _mocks = team_mocks(&mut server);
    let _members = json_mock(&mut server, "/boards/B2/members", keyed(vec![]), MEMBERS);
    let _actions = json_mock(&mut server, "/boards/B2/actions", keyed(vec![]), "[]");

    let source =
        TrelloSource::connect(credentials(), "Backlog", Some("Nope"), &server.url()).unwrap();
    assert_eq!(source.board().id, "B2");

    let unknown_team = Notice::UnknownTeam {
        team: "Nope".into(),
    };
    assert_eq!(source.notices(), vec![unknown_team.clone()]);

    let report = audit::run(&source, &AuditConfig::default(), Utc::now()).unwrap();
    assert_eq!(report.notices, vec![unknown_team]);
    assert!(report
        .render_text()
        .contains("Cannot find team Nope, searched all boards"));
}

#[test]
fn test_actions_request_carries_window() {
    let mut server = Server::new();
    let _boards = json_mock(&mut server, "/members/me/boards", keyed(vec![]), BOARDS);
    let oldest = Utc.with_ymd_and_hms(2019, 11, 5, 0, 0, 0).unwrap();
    let latest = oldest + Duration::days(2);
    let actions = json_mock(
        &mut server,
        "/boards/B2/actions",
        keyed(vec![
            Matcher::UrlEncoded("limit".into(), "50".into()),
            Matcher::UrlEncoded("since".into(), oldest.to_rfc3339()),
            Matcher::UrlEncoded("before".into(), latest.to_rfc3339()),
        ]),
        ACTIONS,
    );

    let source = TrelloSource::connect(credentials(), "Backlog", None, &server.url()).unwrap();
    let window = FetchWindow {
        oldest: Some(oldest),
        latest: Some(latest),
        page_limit: 50,
    };
    let page = source.list_events(source.board(), &window).unwrap();

    actions.assert();
    // the action with an unparseable date is dropped but still fetched
    assert_eq!(page.fetched, 5);
    assert_eq!(page.events.len(), 4);
    assert!(page.events.iter().all(|e| e.container_id == "B2"));
}

#[test]
fn test_board_not_found() {
    let mut server = Server::new();
    let _mocks = team_mocks(&mut server);

    let err = TrelloSource::connect(credentials(), "Backlog", Some("Other"), &server.url())
        .err()
        .unwrap();
    assert!(matches!(err, CoreError::BoardNotFound { .. }));
    assert_eq!(err.to_string(), "Cannot find board Backlog in team Other");
}

#[test]
fn test_board_audit() {
    let mut server = Server::new();
    let _boards = json_mock(&mut server, "/members/me/boards", keyed(vec![]), BOARDS);
    let _members = json_mock(&mut server, "/boards/B2/members", keyed(vec![]), MEMBERS);
    let actions = json_mock(
        &mut server,
        "/boards/B2/actions",
        keyed(vec![Matcher::UrlEncoded("limit".into(), "1000".into())]),
        ACTIONS,
    );

    let source = TrelloSource::connect(credentials(), "Backlog", None, &server.url()).unwrap();
    let now = Utc.with_ymd_and_hms(2019, 11, 7, 0, 0, 0).unwrap();
    let report = audit::run(&source, &AuditConfig::default(), now).unwrap();

    actions.assert();
    assert_eq!(report.source, "trello");
    assert_eq!(report.counts.entry("M1", Category::General), Some(2));
    assert_eq!(report.counts.entry("M2", Category::General), Some(1));
    assert_eq!(report.counts.entry("M9", Category::General), Some(1));
    assert_eq!(report.total, 4);
    assert!(report.notices.is_empty());
    assert!(report.saturated_containers.is_empty());
    assert_eq!(report.display_name("M9"), "Former Member");

    // oldest is the earliest action; daily buckets from 10:00
    assert_eq!(
        report.range.oldest,
        Utc.with_ymd_and_hms(2019, 11, 5, 10, 0, 0).unwrap()
    );
    assert_eq!(report.buckets.len(), 2);
    assert_eq!(report.histogram.series("M1"), Some(&[1, 1][..]));
    assert_eq!(report.histogram.series("M2"), Some(&[1, 0][..]));
    assert_eq!(report.histogram.series("M9"), Some(&[1, 0][..]));

    let text = report.render_text();
    assert!(text.starts_with("Non-Standups:\n\tAlice Ames: 2\n\tBob Roe: 1\n\tFormer Member: 1\n"));
}

#[test]
fn test_actions_failure_becomes_notice() {
    let mut server = Server::new();
    let _boards = json_mock(&mut server, "/members/me/boards", keyed(vec![]), BOARDS);
    let _members = json_mock(&mut server, "/boards/B2/members", keyed(vec![]), MEMBERS);
    let _actions = server
        .mock("GET", "/boards/B2/actions")
        .match_query(Matcher::Any)
        .with_status(401)
        .create();

    let source = TrelloSource::connect(credentials(), "Backlog", None, &server.url()).unwrap();
    let report = audit::run(&source, &AuditConfig::default(), Utc::now()).unwrap();

    assert_eq!(report.total, 0);
    assert!(matches!(
        report.notices.as_slice(),
        [Notice::FetchFailure { container, .. }] if container == "Backlog"
    ));
}
