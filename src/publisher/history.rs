use crate::error::HistoryError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub const SHORT_SHA_LEN: usize = 7;

const FIELD_SEP: char = '\u{1f}';

/// Non-merge commits reachable from `target` but not from `baseline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub baseline: Option<String>,
    pub target: String,
}

impl CommitRange {
    pub fn new(baseline: Option<String>, target: impl Into<String>) -> Self {
        Self {
            baseline,
            target: target.into(),
        }
    }

    /// Revision expression handed to `git log`.
    pub fn revision(&self) -> String {
        match &self.baseline {
            Some(baseline) => format!("{}..{}", baseline, self.target),
            None => self.target.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    pub author: String,
    pub subject: String,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        let end = self.sha.len().min(SHORT_SHA_LEN);
        &self.sha[..end]
    }
}

#[allow(async_fn_in_trait)]
pub trait CommitHistory {
    /// Commits in `range`, newest first, merges excluded.
    async fn commits(&self, range: &CommitRange) -> Result<Vec<Commit>, HistoryError>;
}

/// History read through the `git` binary on `PATH`.
pub struct SystemGit {
    repo_path: PathBuf,
    timeout: Option<Duration>,
}

impl SystemGit {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, HistoryError> {
        let command = format!("git {}", args.join(" "));
        debug!(%command, repo = %self.repo_path.display(), "running git");

        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.repo_path)
            .args(["-c", "core.quotePath=false", "-c", "log.showSignature=false"])
            .args(args)
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| HistoryError::TimedOut {
                    command: command.clone(),
                    timeout,
                })??,
            None => cmd.output().await?,
        };

        if !output.status.success() {
            return Err(HistoryError::Failed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CommitHistory for SystemGit {
    async fn commits(&self, range: &CommitRange) -> Result<Vec<Commit>, HistoryError> {
        let revision = range.revision();
        let stdout = self
            .run(&[
                "log",
                "--no-merges",
                "--format=%H%x1f%an%x1f%s",
                &revision,
                "--",
            ])
            .await?;

        Ok(parse_log(&stdout))
    }
}

fn parse_log(stdout: &str) -> Vec<Commit> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, FIELD_SEP);
            let sha = fields.next()?.trim();
            let author = fields.next()?;
            let subject = fields.next().unwrap_or_default();
            if sha.is_empty() {
                return None;
            }
            Some(Commit {
                sha: sha.to_string(),
                author: author.to_string(),
                subject: subject.to_string(),
            })
        })
        .collect()
}
