mod backend;
mod blocks;
mod commands;
mod config;
mod context;
mod error;
mod export;
mod graph;
mod model;
mod naming;
mod output;
mod platform;
mod reconcile;
mod test_helpers;
mod traits;
mod workspace;
mod writer;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use commands::{ExportArgs, ExportCommand};
use context::Context;
use model::ResourceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "o11y-export")]
#[command(about = "Export Splunk Observability dashboards, charts, detectors and SLOs as Terraform configuration", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("target").multiple(false)))]
struct Cli {
    /// Realm of the organization (e.g. us1, eu0, au0)
    #[arg(short, long, env = "O11Y_REALM")]
    realm: Option<String>,

    /// API access token; prompted for when missing
    #[arg(short, long, env = "O11Y_API_TOKEN", hide_env_values = true)]
    api_key: Option<String>,

    /// Export a dashboard group with its dashboards and charts
    #[arg(long, value_name = "ID", group = "target")]
    group: Option<String>,

    /// Export a single dashboard with its charts
    #[arg(long, value_name = "ID", group = "target")]
    dashboard: Option<String>,

    /// Export a single chart
    #[arg(long, value_name = "ID", group = "target")]
    chart: Option<String>,

    /// Export a detector
    #[arg(long, value_name = "ID", group = "target")]
    detector: Option<String>,

    /// Export an SLO
    #[arg(long, value_name = "ID", group = "target")]
    slo: Option<String>,

    /// Output directory (defaults to ./terraform_output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file (defaults to ./.o11y-export.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remove leftover files in the output directory without asking
    #[arg(short, long)]
    yes: bool,

    /// Show the output of every terraform invocation
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn target(&self) -> Option<(ResourceKind, String)> {
        [
            (ResourceKind::Group, &self.group),
            (ResourceKind::CompositeView, &self.dashboard),
            (ResourceKind::Widget, &self.chart),
            (ResourceKind::AlertRule, &self.detector),
            (ResourceKind::Objective, &self.slo),
        ]
        .into_iter()
        .find_map(|(kind, id)| id.clone().map(|id| (kind, id)))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = ExportArgs {
        target: cli.target(),
        realm: cli.realm,
        api_key: cli.api_key,
        output: cli.output,
        config: cli.config,
        yes: cli.yes,
        verbose: cli.verbose,
    };

    let ctx = Context::new();
    let cwd = std::env::current_dir()?;
    if let Err(e) = ExportCommand::execute(&ctx, &args, &cwd) {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
