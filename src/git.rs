use std::path::Path;

use log::{debug, error, warn};
use tempfile::TempDir;
use tokio::process::Command;

use crate::config::GitConfig;
use crate::error::GitError;

/// Lists the branches of a remote repository through a throwaway bare clone.
///
/// The temporary repository lives exactly as long as the lister; consuming
/// methods remove it before returning.
pub struct BranchLister {
    repo_url: String,
    program: String,
    remote_name: String,
    tmp_dir: TempDir,
}

impl BranchLister {
    pub fn new(repo_url: &str, git: &GitConfig) -> std::io::Result<Self> {
        let tmp_dir = tempfile::Builder::new()
            .prefix("jenkins-helpers-git-")
            .tempdir()?;

        Ok(Self {
            repo_url: repo_url.to_string(),
            program: git.program.clone(),
            remote_name: git.remote_name.clone(),
            tmp_dir,
        })
    }

    pub fn tmp_path(&self) -> &Path {
        self.tmp_dir.path()
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("Running {command}");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(self.tmp_dir.path())
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| GitError::Process {
                command: command.clone(),
                reason: e.to_string(),
                source: Some(e),
            })?;

        if !output.status.success() {
            return Err(GitError::Process {
                command,
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                source: None,
            });
        }

        Ok(output.stdout)
    }

    async fn list(&self) -> Result<Vec<String>, GitError> {
        self.run(&["init", "--bare", "."]).await?;
        self.run(&["remote", "add", self.remote_name.as_str(), self.repo_url.as_str()])
            .await?;
        self.run(&["fetch", "--depth", "1", self.remote_name.as_str()])
            .await?;

        let stdout = self.run(&["branch", "-r", "--list"]).await?;
        let listing = String::from_utf8(stdout)?;
        Ok(parse_branches(&listing, &self.remote_name))
    }

    /// Fetches the remote branch names, removing the temporary repository on every path.
    pub async fn fetch_branches(self) -> Result<Vec<String>, GitError> {
        debug!(
            "Listing branches of {} in {}",
            self.repo_url,
            self.tmp_path().display()
        );
        let result = self.list().await;

        let path = self.tmp_dir.path().to_path_buf();
        if let Err(e) = self.tmp_dir.close() {
            warn!("Failed to remove {}: {e}", path.display());
        }

        result
    }

    /// Like [`fetch_branches`](Self::fetch_branches), but logs failures.
    ///
    /// `None` means the branches are unknown, which callers must not read as
    /// "the repository has no branches".
    pub async fn get_branches(self) -> Option<Vec<String>> {
        let repo_url = self.repo_url.clone();
        match self.fetch_branches().await {
            Ok(branches) => Some(branches),
            Err(e) => {
                error!(
                    "error getting branches for repo {repo_url}: {:?}",
                    anyhow::Error::new(e)
                );
                None
            }
        }
    }
}

/// Parses `git branch -r --list` output into bare branch names.
fn parse_branches(listing: &str, remote_name: &str) -> Vec<String> {
    let prefix = format!("{remote_name}/");
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(" -> "))
        .map(|line| line.strip_prefix(&prefix).unwrap_or(line).to_string())
        .collect()
}
