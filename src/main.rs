use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod github;
mod publisher;

use config::Config;
use github::client::GitHubClient;
use github::types::RepoSlug;
use publisher::inputs::{resolve_token, PublishInputs};
use publisher::{ReleasePublisher, ReleaseState, SystemGit};

#[derive(Parser)]
#[command(name = "release-publisher")]
#[command(about = "Create or update a GitHub release, upload a bundle and attach release notes")]
struct Cli {
    /// GitHub token (can also be set via GITHUB_TOKEN or GH_TOKEN)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Repository as owner/name
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local checkout to read commit history from
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update a release, upload the bundle and attach notes
    Publish {
        /// Release name, used as tag and title
        name: Option<String>,

        /// Branch or tag the release points at
        target: Option<String>,

        /// Prebuilt artifact bundle to upload
        bundle: Option<PathBuf>,

        /// Mark as prerelease (true/false, default true)
        prerelease: Option<String>,
    },

    /// Print the notes a release at TARGET would get, without publishing
    Notes {
        /// Branch or tag to collect commits up to
        target: String,

        /// Release tag never used as the baseline
        #[arg(long)]
        exclude: Option<String>,

        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        token,
        repo,
        config,
        repo_path,
        command,
    } = Cli::parse();
    let config = Config::load(config.as_deref())?;

    match command {
        Commands::Publish {
            name,
            target,
            bundle,
            prerelease,
        } => {
            let inputs = PublishInputs::validate(name, target, bundle, prerelease)?;
            let client = connect(token, repo)?;
            let publisher = ReleasePublisher::new(
                client,
                history(&repo_path, &config),
                &config.notes,
                &std::env::current_dir()?,
            );

            let report = publisher.publish(&inputs).await?;
            let action = match report.state {
                ReleaseState::Created => "created",
                ReleaseState::Updated => "updated",
            };
            let notes = if report.notes.is_inline() {
                "inline"
            } else {
                "attached as file"
            };
            println!(
                "Release {} {}: {} commits since {}, notes {}",
                inputs.release.name,
                action,
                report.commit_count,
                report.range.baseline.as_deref().unwrap_or("the beginning"),
                notes
            );
        }
        Commands::Notes {
            target,
            exclude,
            output,
        } => {
            let client = connect(token, repo)?;
            let publisher = ReleasePublisher::new(
                client,
                history(&repo_path, &config),
                &config.notes,
                &std::env::current_dir()?,
            );

            let rendered = publisher
                .render_notes(&target, exclude.as_deref().unwrap_or_default())
                .await?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, &rendered.document)
                    .with_context(|| format!("failed to write {}", output_path.display()))?;
                println!("Release notes written successfully!");
            } else {
                print!("{}", rendered.document);
            }
        }
    }

    Ok(())
}

/// Resolve repository and credential, then build the API client once for the run.
fn connect(token: Option<String>, repo: Option<String>) -> Result<GitHubClient> {
    let repo: RepoSlug = repo
        .unwrap_or_default()
        .parse()
        .context("set --repo or GITHUB_REPOSITORY")?;
    let token = resolve_token([token, std::env::var("GH_TOKEN").ok()])?;
    Ok(GitHubClient::new(token, repo)?)
}

fn history(repo_path: &Path, config: &Config) -> SystemGit {
    SystemGit::new(repo_path).with_timeout(config.git.timeout_secs.map(Duration::from_secs))
}
