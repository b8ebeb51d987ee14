//! CLI for the Bitbucket issue migrator.
//!
//! This tool copies a Bitbucket Cloud issue tracker into a GitHub
//! repository through the asynchronous bulk issue-import endpoint.

use bitbucket_issue_migrator::{
    load_user_map, IssueOutcome, MigrationConfig, MigrationReport, Runner, RunnerError,
    SourceAuth,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Bitbucket Issue Migrator - copy a Bitbucket issue tracker to GitHub.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bitbucket repository to pull issues from (owner/slug).
    #[arg(long)]
    bitbucket_repo: String,

    /// GitHub repository to import issues into (owner/name).
    #[arg(long)]
    github_repo: String,

    /// GitHub Personal Access Token with issue-write scope.
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: String,

    /// Bitbucket username, for private repositories.
    #[arg(long, requires = "bitbucket_app_password")]
    bitbucket_username: Option<String>,

    /// Bitbucket app password, for private repositories.
    #[arg(long, env = "BITBUCKET_APP_PASSWORD", requires = "bitbucket_username")]
    bitbucket_app_password: Option<String>,

    /// Fetch and map issues but print payloads instead of submitting.
    #[arg(long)]
    dry_run: bool,

    /// Number of issues, in fetch order, to skip before submitting.
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Maximum concurrent Bitbucket fetches.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Username override as bitbucket=github; repeatable. An empty
    /// GitHub name suppresses attribution for that user.
    #[arg(long = "map-user", value_name = "SRC=DST")]
    map_user: Vec<String>,

    /// TOML file with a [users] table of overrides.
    #[arg(long)]
    users_file: Option<PathBuf>,

    /// Treat unmapped Bitbucket usernames as identical GitHub usernames.
    #[arg(long)]
    assume_same_names: bool,

    /// Skip attribution annotations for this user's comments.
    #[arg(long)]
    suppress_attribution: Option<String>,

    /// Rewrite <<changeset ...>> markers into Bitbucket commit links.
    #[arg(long)]
    link_changesets: bool,

    /// Append a note listing attachment file names.
    #[arg(long)]
    mention_attachments: bool,

    /// Replay Bitbucket status changes as comments.
    #[arg(long)]
    mention_status_changes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();

    match run(args).await {
        Ok(report) => {
            print_report(&report);

            if report.aborted.is_some() {
                ExitCode::from(2)
            } else if report.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::from(0)
            }
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<MigrationReport, RunnerError> {
    let mut user_map = Vec::new();
    if let Some(path) = &args.users_file {
        user_map.extend(load_user_map(path)?);
    }
    for pair in &args.map_user {
        let (source, dest) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
        user_map.push((source.to_string(), dest.to_string()));
    }

    let bitbucket_auth = match (args.bitbucket_username, args.bitbucket_app_password) {
        (Some(username), Some(app_password)) => Some(SourceAuth {
            username,
            app_password,
        }),
        _ => None,
    };

    let config = MigrationConfig {
        bitbucket_repo: args.bitbucket_repo,
        github_repo: args.github_repo,
        github_token: args.github_token,
        bitbucket_auth,
        dry_run: args.dry_run,
        skip: args.skip,
        concurrency: args.concurrency,
        user_map,
        assume_same_names: args.assume_same_names,
        suppress_attribution: args.suppress_attribution,
        link_changesets: args.link_changesets,
        mention_attachments: args.mention_attachments,
        mention_status_changes: args.mention_status_changes,
    };

    let runner = Runner::new(config)?;
    runner.run().await
}

/// Prints the final run report.
fn print_report(report: &MigrationReport) {
    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if report.dry_run { "Dry Run" } else { "Live" }
    );
    if let Some(total) = report.total_advertised {
        println!("  Issues advertised by the source: {total}");
    }
    println!("  Issues submitted: {}", report.submitted);
    println!("  Issues skipped: {}", report.skipped);
    println!("  Issues failed: {}", report.failed);

    for outcome in report.failures() {
        if let IssueOutcome::Failed { source_id, error } = outcome {
            println!("    #{source_id}: {error}");
        }
    }

    if let Some(cause) = &report.aborted {
        println!("  Run aborted early: {cause}");
    }
}
