use serde::{Deserialize, Serialize};

/// GitHub refuses release bodies longer than this many characters.
pub const DEFAULT_INLINE_LIMIT: usize = 125_000;

pub const DEFAULT_NOTES_FILE: &str = "release-notes.txt";

pub const DEFAULT_PLACEHOLDER: &str =
    "The release notes are too long to display here and are attached as release-notes.txt.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notes: NotesConfig,
    pub git: GitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Largest document, in bytes, that is embedded in the release body.
    pub inline_limit: usize,
    pub file_name: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Upper bound for a single git invocation. Unbounded when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        NotesConfig {
            inline_limit: DEFAULT_INLINE_LIMIT,
            file_name: DEFAULT_NOTES_FILE.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}
