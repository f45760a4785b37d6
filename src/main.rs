use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use release_flow::config;
use release_flow::domain::{Increment, ReleaseType};
use release_flow::git::{open_backend, GitBackend};
use release_flow::ui;
use release_flow::workflow::{ReleaseFlow, ReleaseOutcome};

#[derive(Parser)]
#[command(
    name = "release-flow",
    version,
    about = "Move feature branches through release candidates to stable releases"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        short = 'C',
        long,
        global = true,
        default_value = ".",
        help = "Repository working directory"
    )]
    workdir: PathBuf,

    #[arg(short, long, global = true, help = "Skip confirmation prompts")]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage feature branches
    Feature {
        #[command(subcommand)]
        action: FeatureCommand,
    },
    /// Cut releases from the labelled features
    Release {
        #[command(subcommand)]
        action: ReleaseCommand,
    },
    /// Show versions computed from the repository
    Version {
        #[arg(value_enum, default_value = "latest")]
        query: VersionQuery,
    },
}

#[derive(Subcommand)]
enum FeatureCommand {
    /// List feature branches with their state
    List,
    /// Create a feature branch from the base branch
    Start { name: String },
    /// Delete a feature branch
    Close { name: String },
    /// Mark a feature ready for the next release candidate
    Candidate { name: String },
    /// Mark a feature ready for the next stable release
    Stable { name: String },
    /// Remove the release labels from a feature
    Reset { name: String },
}

#[derive(Subcommand)]
enum ReleaseCommand {
    /// Cut a release candidate branch and tag
    Candidate {
        #[arg(long, default_value = "patch", value_parser = parse_bump)]
        bump: Increment,
    },
    /// Merge the stable features into the base branch, tag and clean up
    Stable,
}

#[derive(Clone, Copy, ValueEnum)]
enum VersionQuery {
    Latest,
    Candidate,
    Stable,
    Tags,
}

fn parse_bump(value: &str) -> std::result::Result<Increment, String> {
    match value.parse::<Increment>() {
        Ok(bump @ (Increment::Major | Increment::Minor | Increment::Patch)) => Ok(bump),
        Ok(other) => Err(format!("bump must be major, minor or patch, not {}", other)),
        Err(e) => Err(e.to_string()),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("release_flow=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref()).context("Error loading config")?;
    let backend = open_backend(&config, &args.workdir, None)?;
    let flow =
        ReleaseFlow::new(&*backend, config.hooks.clone()).with_workdir(args.workdir.clone());

    match args.command {
        Command::Feature { action } => run_feature(&flow, action),
        Command::Release { action } => run_release(&flow, action, args.yes),
        Command::Version { query } => run_version(&*backend, query),
    }
}

fn run_feature(flow: &ReleaseFlow, action: FeatureCommand) -> Result<()> {
    let feature = match action {
        FeatureCommand::List => {
            ui::display_features(&flow.features()?);
            return Ok(());
        }
        FeatureCommand::Start { name } => flow.start_feature(&name)?,
        FeatureCommand::Close { name } => flow.close_feature(&name)?,
        FeatureCommand::Candidate { name } => flow.mark_ready_for_candidate(&name)?,
        FeatureCommand::Stable { name } => flow.mark_ready_for_stable(&name)?,
        FeatureCommand::Reset { name } => flow.mark_as_new(&name)?,
    };

    ui::display_success(&format!("Feature '{}' is now {}", feature.name, feature.status));
    if let Some(url) = feature.release_request.as_ref().and_then(|rr| rr.url.as_deref()) {
        ui::display_status(&format!("Release request: {}", url));
    }
    Ok(())
}

fn run_release(flow: &ReleaseFlow, action: ReleaseCommand, assume_yes: bool) -> Result<()> {
    let outcome = match action {
        ReleaseCommand::Candidate { bump } => flow.release_candidate(bump, |version, features| {
            ui::confirm_release(ReleaseType::Candidate, version, features, assume_yes)
        })?,
        ReleaseCommand::Stable => flow.release_stable(|version, features| {
            ui::confirm_release(ReleaseType::Stable, version, features, assume_yes)
        })?,
    };

    match outcome {
        ReleaseOutcome::Cancelled => {
            println!("Release cancelled by user.");
        }
        ReleaseOutcome::Released { release, warnings } => {
            for warning in &warnings {
                ui::display_warning(warning);
            }
            ui::display_release(&release);
        }
    }
    Ok(())
}

fn run_version(backend: &dyn GitBackend, query: VersionQuery) -> Result<()> {
    match query {
        VersionQuery::Latest => {
            ui::display_version("latest", &backend.get_latest_version()?.to_string());
        }
        VersionQuery::Candidate => {
            let next = backend.get_release_candidate_version(Increment::Patch)?;
            ui::display_version("candidate", &next.to_string());
        }
        VersionQuery::Stable => {
            ui::display_version("stable", &backend.get_release_stable_version()?.to_string());
        }
        VersionQuery::Tags => {
            ui::display_version("candidate", &backend.get_latest_release_candidate_tag()?);
            ui::display_version("stable", &backend.get_latest_release_stable_tag()?);
        }
    }
    Ok(())
}
