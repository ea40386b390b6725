use super::history::Commit;
use crate::config::NotesConfig;
use std::path::{Path, PathBuf};

/// One `<subject> by <author> in <short-sha>` line per commit, in the given order.
pub fn render(commits: &[Commit]) -> String {
    commits
        .iter()
        .map(|c| format!("{} by {} in {}\n", c.subject, c.author, c.short_sha()))
        .collect()
}

/// How the notes end up on the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesAttachment {
    /// The whole document becomes the release body.
    Inline(String),
    /// The body is a placeholder and the document is uploaded as an asset.
    File { placeholder: String, path: PathBuf },
}

impl NotesAttachment {
    pub fn is_inline(&self) -> bool {
        matches!(self, NotesAttachment::Inline(_))
    }
}

/// Decides between inline and file attachment by byte length.
#[derive(Debug, Clone)]
pub struct NotesPolicy {
    inline_limit: usize,
    placeholder: String,
}

impl NotesPolicy {
    pub fn new(config: &NotesConfig) -> Self {
        Self {
            inline_limit: config.inline_limit,
            placeholder: config.placeholder.clone(),
        }
    }

    pub fn attach(&self, document: String, file: &Path) -> NotesAttachment {
        if document.len() <= self.inline_limit {
            NotesAttachment::Inline(document)
        } else {
            NotesAttachment::File {
                placeholder: self.placeholder.clone(),
                path: file.to_path_buf(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn commit(sha: &str, author: &str, subject: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
            author: author.to_string(),
            subject: subject.to_string(),
        }
    }

    #[test]
    fn renders_one_line_per_commit() {
        let commits = vec![
            commit("a1b2c3d4e5f6", "Ada Lovelace", "Add release upload"),
            commit("0f0f0f0f0f0f", "Grace Hopper", "Fix notes size check"),
        ];

        assert_eq!(
            render(&commits),
            "Add release upload by Ada Lovelace in a1b2c3d\n\
             Fix notes size check by Grace Hopper in 0f0f0f0\n"
        );
    }

    #[test]
    fn empty_range_renders_empty_document() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn threshold_is_inclusive() {
        let policy = NotesPolicy::new(&NotesConfig::default());
        let file = Path::new("release-notes.txt");

        let at_limit = "x".repeat(125_000);
        assert_eq!(
            policy.attach(at_limit.clone(), file),
            NotesAttachment::Inline(at_limit)
        );

        let over_limit = "x".repeat(125_001);
        assert_eq!(
            policy.attach(over_limit, file),
            NotesAttachment::File {
                placeholder: NotesConfig::default().placeholder,
                path: file.to_path_buf(),
            }
        );
    }

    #[test]
    fn limit_counts_bytes_not_chars() {
        let policy = NotesPolicy::new(&NotesConfig {
            inline_limit: 4,
            ..NotesConfig::default()
        });
        // three chars, six bytes
        let document = "ééé".to_string();
        assert!(!policy.attach(document, Path::new("n.txt")).is_inline());
    }
}
