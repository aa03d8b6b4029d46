mod builds;
mod client;
mod jobs;
mod types;
mod walker;

pub use builds::BuildStopper;
pub use client::{join_url, JenkinsClient};
pub use jobs::{BranchJobs, CreateOutcome};
pub use types::ApiFailure;
pub use walker::FolderWalker;
