mod change;
mod ci;
mod config;
mod monitor;
mod orchestrate;
mod report;
mod tracker;
mod workitem;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use ci::{BambooClient, BuildPlanClient};
use report::Verdict;
use tracker::JiraClient;

/// Release Verifier: triggers the CI builds behind a work item's pull
/// requests and waits for every one of them to finish.
#[derive(Parser, Debug)]
#[command(name = "release-verifier", version, about)]
struct Cli {
    /// Work item key (e.g., PAY-123)
    work_item: String,

    /// Manifest listing each work item's pull requests and build plans
    #[arg(short, long, default_value = "work-items.toml")]
    manifest: PathBuf,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Move the work item along its workflow when every build passed
    #[arg(long)]
    transition: bool,

    /// List the work item's subtasks that are ready to process
    #[arg(long)]
    list_subtasks: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let span = info_span!("verify", work_item = %cli.work_item);
    run(cli).instrument(span).await
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let config = config::Config::load()?;

    info!(manifest = %cli.manifest.display(), "loading work item manifest");
    let manifest = workitem::WorkItemManifest::load(&cli.manifest)?;
    let work_item = manifest.find(&cli.work_item)?;

    info!("resolving change requests");
    let changes = change::resolve_all(&work_item.change_request_urls(), &config.bitbucket).await;
    let plan_keys = work_item.plan_keys();
    info!(changes = changes.len(), plans = plan_keys.len(), "work item links resolved");

    let client: Arc<dyn BuildPlanClient> = Arc::new(BambooClient::new(&config.bamboo));
    let states = orchestrate::verify(
        client,
        &work_item.key,
        &changes,
        &plan_keys,
        config.monitor.poll_interval(),
    )
    .await;

    let built_report = report::build(&work_item.key, &states, &config.bamboo.url);
    report::output(&built_report, cli.output.as_deref())?;
    info!(verdict = %built_report.verdict, "verification finished");

    if cli.list_subtasks || cli.transition {
        let jira = JiraClient::from_config(&config.jira)?;

        if cli.list_subtasks {
            let subtasks = jira
                .list_subtasks(&work_item.key, &config.jira.ready_status_id)
                .await?;
            for subtask in &subtasks {
                println!("- {}: {} ({})", subtask.key, subtask.summary, subtask.status_name);
            }
        }

        if cli.transition {
            if built_report.verdict == Verdict::Passed {
                let applied = jira
                    .transition_issue(&work_item.key, &config.jira.transitions)
                    .await?;
                info!(transition = %applied, "work item transitioned");
            } else {
                warn!(verdict = %built_report.verdict, "not transitioning work item");
            }
        }
    }

    Ok(())
}
