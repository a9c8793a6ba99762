pub mod completions;
pub mod config;
pub mod slack;
pub mod trello;

use clap::Args;
use teamtally_core::{AsciiChart, AuditOverrides, AuditReport};

/// Date window and bucketing flags shared by the audit commands.
#[derive(Args, Debug)]
pub struct RangeArgs {
    /// Earliest date to include (default: earliest fetched event)
    #[arg(short, long)]
    pub oldest: Option<String>,

    /// Latest date to include (default: now)
    #[arg(short, long)]
    pub latest: Option<String>,

    /// strftime format for --oldest/--latest (default from settings, "%m/%d/%Y")
    #[arg(long = "format")]
    pub date_format: Option<String>,

    /// Histogram bucket width in hours
    #[arg(short, long)]
    pub increment: Option<u32>,

    /// Maximum events requested per container
    #[arg(long)]
    pub page_limit: Option<usize>,
}

impl RangeArgs {
    pub fn overrides(&self) -> AuditOverrides {
        AuditOverrides {
            oldest: self.oldest.clone(),
            latest: self.latest.clone(),
            date_format: self.date_format.clone(),
            increment_hours: self.increment,
            page_limit: self.page_limit,
        }
    }
}

/// How an audit report is printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub chart: bool,
    pub by_container: bool,
}

pub fn print_report(
    report: &AuditReport,
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    if output.by_container {
        print!("{}", report.render_by_container());
        println!();
    }
    print!("{}", report.render_text());
    if output.chart {
        let mut sink = AsciiChart::new();
        report.draw_chart(&mut sink)?;
        print!("{}", sink.into_string());
    }
    Ok(())
}
