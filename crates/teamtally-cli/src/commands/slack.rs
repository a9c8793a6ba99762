use chrono::Utc;
use clap::Args;
use teamtally_core::config::require;
use teamtally_core::{audit, AuditConfig, Settings, SlackSource};
use tracing::debug;

use super::{print_report, Output, RangeArgs};

#[derive(Args, Debug)]
pub struct SlackArgs {
    /// Slack user or bot token
    #[arg(short, long)]
    pub token: String,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Also draw the per-member activity chart
    #[arg(long)]
    pub chart: bool,

    /// Also list counts per channel
    #[arg(long)]
    pub by_channel: bool,
}

pub fn run(args: SlackArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    let token = require("token", &args.token)?;
    let config = AuditConfig::build(&settings, &args.range.overrides())?;
    debug!(?config, "audit configuration");

    let source = SlackSource::new(token, &settings.slack_api_url)?;
    let report = audit::run(&source, &config, Utc::now())?;
    let output = Output {
        json,
        chart: args.chart,
        by_container: args.by_channel,
    };
    print_report(&report, output)
}
