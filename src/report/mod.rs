pub mod types;

pub use types::{BuildOutcome, Report, Verdict};

use crate::ci::{BuildState, QueuedBuild};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from the final build states of a work item.
///
/// `ci_url` is the CI server root used for browse links.
pub fn build(work_item: &str, states: &BTreeMap<QueuedBuild, BuildState>, ci_url: &str) -> Report {
    let builds: Vec<BuildOutcome> = states
        .iter()
        .map(|(build, state)| BuildOutcome {
            reference: build.to_string(),
            state: *state,
            browse_url: build.result_key().map(|key| browse_url(ci_url, key)),
        })
        .collect();

    let verdict = if builds.is_empty() {
        Verdict::NothingToVerify
    } else if builds.iter().all(|b| b.state == BuildState::Successful) {
        Verdict::Passed
    } else {
        Verdict::Failed
    };

    Report {
        work_item: work_item.to_string(),
        builds,
        verdict,
    }
}

/// CI page of a build result.
pub fn browse_url(ci_url: &str, result_key: &str) -> String {
    format!("{}/browse/{}", ci_url.trim_end_matches('/'), result_key)
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(work_item = %report.work_item, verdict = %report.verdict))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn print_terminal_report(report: &Report) {
    println!();
    println!("Work item {}: {} build(s)", report.work_item, report.builds.len());
    println!();

    if report.builds.is_empty() {
        println!("  No builds were queued.");
    }
    for outcome in &report.builds {
        println!("  • {} {}", colorize_state(outcome.state), outcome.reference);
        if let Some(url) = &outcome.browse_url {
            println!("    {}", url);
        }
    }
    println!();

    println!("═══ Verdict: {} ═══", colorize_verdict(report.verdict));
    println!();
}

fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Work item {}\n\n", report.work_item));

    if report.builds.is_empty() {
        md.push_str("No builds were queued.\n\n");
    } else {
        md.push_str("| State | Build | Link |\n|---|---|---|\n");
        for outcome in &report.builds {
            let link = match &outcome.browse_url {
                Some(url) => format!("[open]({})", url),
                None => "-".to_string(),
            };
            md.push_str(&format!(
                "| **{}** | `{}` | {} |\n",
                outcome.state, outcome.reference, link
            ));
        }
        md.push('\n');
    }

    md.push_str(&format!("## Verdict: {}\n", report.verdict));

    std::fs::write(path, md)?;
    Ok(())
}

fn colorize_state(state: BuildState) -> colored::ColoredString {
    let label = state.to_string();
    match state {
        BuildState::Successful => label.green().bold(),
        BuildState::Failed | BuildState::Error => label.red().bold(),
        BuildState::Unknown | BuildState::InProgress(_) => label.yellow(),
    }
}

fn colorize_verdict(verdict: Verdict) -> colored::ColoredString {
    let label = verdict.to_string();
    match verdict {
        Verdict::Passed => label.green().bold(),
        Verdict::Failed => label.red().bold(),
        Verdict::NothingToVerify => label.yellow().bold(),
    }
}
