use chrono::Utc;
use clap::Args;
use teamtally_core::config::require;
use teamtally_core::{audit, AuditConfig, Settings, TrelloCredentials, TrelloSource};
use tracing::debug;

use super::{print_report, Output, RangeArgs};

#[derive(Args, Debug)]
pub struct TrelloArgs {
    /// Trello API key
    #[arg(short, long)]
    pub key: String,

    /// Trello user token
    #[arg(short, long)]
    pub token: String,

    /// Board name
    #[arg(short, long)]
    pub board: String,

    /// Team (organization) display name the board belongs to
    #[arg(long)]
    pub team: Option<String>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Skip the activity chart
    #[arg(long)]
    pub no_chart: bool,
}

pub fn run(args: TrelloArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    let credentials = TrelloCredentials {
        key: require("key", &args.key)?.to_string(),
        token: require("token", &args.token)?.to_string(),
    };
    let board = require("board", &args.board)?;
    let config = AuditConfig::build(&settings, &args.range.overrides())?;
    debug!(?config, "audit configuration");

    let source = TrelloSource::connect(
        credentials,
        board,
        args.team.as_deref(),
        &settings.trello_api_url,
    )?;
    let report = audit::run(&source, &config, Utc::now())?;
    let output = Output {
        json,
        chart: !args.no_chart,
        by_container: false,
    };
    print_report(&report, output)
}
