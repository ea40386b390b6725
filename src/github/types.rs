use crate::error::{PlatformError, ValidationError};
use chrono::{DateTime, Utc};
use octocrab::models;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// `owner/name` of the repository releases are published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(RepoSlug {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ValidationError::InvalidRepository(s.to_string())),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// What a release is created with. The name doubles as tag and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub name: String,
    pub target: String,
    pub prerelease: bool,
}

/// Result of a create attempt.
#[derive(Debug)]
pub enum CreateOutcome {
    Created,
    /// A release with this tag is already there; callers update it instead.
    AlreadyExists,
    Failed(PlatformError),
}

/// The parts of a listed release that baseline selection looks at.
#[derive(Debug, Clone)]
pub struct Release {
    pub tag_name: String,
    pub draft: bool,
    pub prerelease: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<&models::repos::Release> for Release {
    fn from(release: &models::repos::Release) -> Self {
        Release {
            tag_name: release.tag_name.clone(),
            draft: release.draft,
            prerelease: release.prerelease,
            published_at: release.published_at,
        }
    }
}

/// Most recently published stable release whose tag is not `exclude`.
pub fn previous_stable(releases: &[Release], exclude: &str) -> Option<String> {
    releases
        .iter()
        .filter(|r| !r.draft && !r.prerelease && r.tag_name != exclude)
        .max_by_key(|r| r.published_at)
        .map(|r| r.tag_name.clone())
}

/// Remote operations the publisher needs from the hosting platform.
#[allow(async_fn_in_trait)]
pub trait ReleasePlatform {
    async fn create_release(&self, spec: &ReleaseSpec) -> CreateOutcome;

    /// Upload `path` under its file name, replacing any asset with the same name.
    async fn upload_asset(&self, tag: &str, path: &Path) -> Result<(), PlatformError>;

    /// Remove the asset called `name`. Nothing to remove is not an error.
    async fn delete_asset(&self, tag: &str, name: &str) -> Result<(), PlatformError>;

    /// Tag of the latest non-draft, non-prerelease release other than `exclude`.
    async fn latest_stable_tag(&self, exclude: &str) -> Result<Option<String>, PlatformError>;

    async fn set_notes(&self, tag: &str, body: &str) -> Result<(), PlatformError>;
}

impl<T: ReleasePlatform> ReleasePlatform for &T {
    async fn create_release(&self, spec: &ReleaseSpec) -> CreateOutcome {
        (**self).create_release(spec).await
    }

    async fn upload_asset(&self, tag: &str, path: &Path) -> Result<(), PlatformError> {
        (**self).upload_asset(tag, path).await
    }

    async fn delete_asset(&self, tag: &str, name: &str) -> Result<(), PlatformError> {
        (**self).delete_asset(tag, name).await
    }

    async fn latest_stable_tag(&self, exclude: &str) -> Result<Option<String>, PlatformError> {
        (**self).latest_stable_tag(exclude).await
    }

    async fn set_notes(&self, tag: &str, body: &str) -> Result<(), PlatformError> {
        (**self).set_notes(tag, body).await
    }
}
