use super::history::{CommitHistory, CommitRange};
use super::inputs::PublishInputs;
use super::notes::{self, NotesAttachment, NotesPolicy};
use crate::config::NotesConfig;
use crate::error::PublishError;
use crate::github::types::{CreateOutcome, ReleasePlatform};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Whether the run made a new release or reused an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Created,
    Updated,
}

#[derive(Debug)]
pub struct PublishReport {
    pub state: ReleaseState,
    pub range: CommitRange,
    pub commit_count: usize,
    pub notes: NotesAttachment,
}

/// Rendered notes for a range, before anything is attached.
#[derive(Debug)]
pub struct RenderedNotes {
    pub range: CommitRange,
    pub commit_count: usize,
    pub document: String,
}

pub struct ReleasePublisher<P, H> {
    platform: P,
    history: H,
    policy: NotesPolicy,
    notes_path: PathBuf,
}

impl<P: ReleasePlatform, H: CommitHistory> ReleasePublisher<P, H> {
    /// The notes file is written to `work_dir` under the configured file name.
    pub fn new(platform: P, history: H, notes: &NotesConfig, work_dir: &Path) -> Self {
        Self {
            platform,
            history,
            policy: NotesPolicy::new(notes),
            notes_path: work_dir.join(&notes.file_name),
        }
    }

    /// Create-or-update the release, upload the bundle and attach fresh notes.
    ///
    /// Steps are not transactional: a failure while attaching notes leaves the
    /// already uploaded bundle in place and the error says which step failed.
    pub async fn publish(&self, inputs: &PublishInputs) -> Result<PublishReport, PublishError> {
        let spec = &inputs.release;

        let state = match self.platform.create_release(spec).await {
            CreateOutcome::Created => ReleaseState::Created,
            CreateOutcome::AlreadyExists => {
                warn!(tag = %spec.name, "release already exists, updating it in place");
                ReleaseState::Updated
            }
            CreateOutcome::Failed(e) => return Err(PublishError::Create(e)),
        };

        self.platform
            .upload_asset(&spec.name, &inputs.bundle)
            .await
            .map_err(|source| PublishError::Upload {
                path: inputs.bundle.clone(),
                source,
            })?;
        info!(bundle = %inputs.bundle.display(), "bundle uploaded");

        let rendered = self.render_notes(&spec.target, &spec.name).await?;
        tokio::fs::write(&self.notes_path, &rendered.document)
            .await
            .map_err(|source| PublishError::NotesFile {
                path: self.notes_path.clone(),
                source,
            })?;

        let attachment = self.policy.attach(rendered.document, &self.notes_path);
        match &attachment {
            NotesAttachment::Inline(body) => {
                self.platform
                    .set_notes(&spec.name, body)
                    .await
                    .map_err(PublishError::Notes)?;
                // a file left by an earlier, larger run would describe another range
                if let Some(stale) = self.notes_path.file_name().and_then(|n| n.to_str()) {
                    self.platform
                        .delete_asset(&spec.name, stale)
                        .await
                        .map_err(PublishError::Notes)?;
                }
            }
            NotesAttachment::File { placeholder, path } => {
                info!(path = %path.display(), "notes too large for the release body, attaching as a file");
                self.platform
                    .set_notes(&spec.name, placeholder)
                    .await
                    .map_err(PublishError::Notes)?;
                self.platform
                    .upload_asset(&spec.name, path)
                    .await
                    .map_err(PublishError::Notes)?;
            }
        }

        info!(
            tag = %spec.name,
            commits = rendered.commit_count,
            inline = attachment.is_inline(),
            "release published"
        );

        Ok(PublishReport {
            state,
            range: rendered.range,
            commit_count: rendered.commit_count,
            notes: attachment,
        })
    }

    /// Baseline lookup plus history walk. Reads from the platform, never writes.
    pub async fn render_notes(&self, target: &str, exclude: &str) -> Result<RenderedNotes, PublishError> {
        let baseline = self
            .platform
            .latest_stable_tag(exclude)
            .await
            .map_err(PublishError::Baseline)?;
        match &baseline {
            Some(tag) => info!(baseline = %tag, "collecting commits since last stable release"),
            None => info!("no stable release yet, collecting full history"),
        }

        let range = CommitRange::new(baseline, target);
        let commits = self.history.commits(&range).await?;

        Ok(RenderedNotes {
            range,
            commit_count: commits.len(),
            document: notes::render(&commits),
        })
    }
}
