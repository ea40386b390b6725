pub mod history;
pub mod inputs;
pub mod notes;
pub mod release_publisher;

pub use history::SystemGit;
pub use release_publisher::{ReleasePublisher, ReleaseState};
