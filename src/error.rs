use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Problems with the invocation itself, detected before any remote call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid prerelease flag `{0}` (expected true/false)")]
    InvalidPrerelease(String),

    #[error("artifact bundle not found: {}", .0.display())]
    BundleNotFound(PathBuf),

    #[error("invalid repository `{0}` (expected owner/name)")]
    InvalidRepository(String),

    #[error("no GitHub token provided (set GITHUB_TOKEN or GH_TOKEN)")]
    MissingToken,
}

/// A failed call against the release platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("GitHub API error: {message}")]
    Api { status: Option<u16>, message: String },

    #[error("release `{0}` not found")]
    ReleaseNotFound(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<octocrab::Error> for PlatformError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => PlatformError::Api {
                status: Some(source.status_code.as_u16()),
                message: source.message.clone(),
            },
            other => PlatformError::Api {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// A failed walk of the local commit history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("`{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

/// The step at which a publish run stopped.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to create release: {0}")]
    Create(#[source] PlatformError),

    #[error("failed to upload {}: {source}", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: PlatformError,
    },

    #[error("failed to determine baseline release: {0}")]
    Baseline(#[source] PlatformError),

    #[error("failed to read commit history: {0}")]
    History(#[from] HistoryError),

    #[error("failed to write release notes to {}: {source}", .path.display())]
    NotesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to attach release notes: {0}")]
    Notes(#[source] PlatformError),
}
