use std::collections::HashSet;
use std::path::Path;

use log::{debug, info, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::error::{JenkinsError, Result};

use super::client::{join_url, JenkinsClient};
use super::types::{JobKind, JobRef};

/// Literal token replaced with the branch name in job templates.
pub const BRANCH_PLACEHOLDER: &str = "{BRANCH_NAME}";

// Element path below the document root holding the git branch of a job.
const BRANCH_SPEC_PATH: [&str; 4] = ["scm", "branches", "hudson.plugins.git.BranchSpec", "name"];

/// Result of [`BranchJobs::create_job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// A branch job whose branch no longer exists on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleJob {
    pub branch: String,
    pub url: String,
}

#[derive(Deserialize)]
struct RootResponse {
    #[serde(default)]
    jobs: Vec<FolderEntry>,
}

#[derive(Deserialize)]
struct FolderEntry {
    #[serde(rename = "_class")]
    class: String,
    name: String,
    url: String,
    #[serde(default)]
    jobs: Vec<JobRef>,
}

/// Per-branch jobs living in one Jenkins folder (or at the top level).
pub struct BranchJobs<'a> {
    client: &'a JenkinsClient,
    folder_url: String,
    branch_job_urls: Vec<String>,
}

impl<'a> BranchJobs<'a> {
    /// Jobs at the top level of the Jenkins instance.
    pub fn top_level(client: &'a JenkinsClient) -> Self {
        Self {
            client,
            folder_url: client.base_url().to_string(),
            branch_job_urls: Vec::new(),
        }
    }

    /// Looks up the top-level folder called `folder` and its child jobs.
    ///
    /// # Errors
    ///
    /// Returns [`JenkinsError::FolderNotFound`] when no top-level folder has that name.
    pub async fn in_folder(client: &'a JenkinsClient, folder: &str) -> Result<Self> {
        let url = join_url(client.base_url(), "api/json");
        let root: RootResponse = client
            .get_json(&url, &[("tree", "jobs[name,url,jobs[name,url]]")])
            .await?;

        let entry = root
            .jobs
            .into_iter()
            .find(|j| j.name == folder && JobKind::classify(&j.class) == JobKind::Folder)
            .ok_or_else(|| JenkinsError::FolderNotFound(folder.to_string()))?;

        debug!("Folder {} has {} jobs", entry.name, entry.jobs.len());

        Ok(Self {
            client,
            folder_url: entry.url.trim_end_matches('/').to_string(),
            branch_job_urls: entry.jobs.into_iter().map(|j| j.url).collect(),
        })
    }

    pub fn folder_url(&self) -> &str {
        &self.folder_url
    }

    fn job_url(&self, safe_name: &str) -> String {
        join_url(&self.folder_url, &format!("job/{safe_name}"))
    }

    /// True only when `config.xml` of the job can be fetched.
    ///
    /// Network, authentication and not-found errors all read as "does not exist".
    pub async fn job_exists(&self, name: &str) -> bool {
        let url = join_url(&self.job_url(&url_safe_name(name)), "config.xml");
        match self.client.get_text(&url).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Job {name} treated as missing: {e}");
                false
            }
        }
    }

    /// Creates the job for `branch` from the template at `config_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be read or Jenkins rejects the request.
    pub async fn create_job(&self, branch: &str, config_path: &Path) -> Result<CreateOutcome> {
        let safe_name = url_safe_name(branch);
        if self.job_exists(branch).await {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let template = std::fs::read(config_path)?;
        let config = render_config(&template, branch);
        let url = join_url(&self.folder_url, "createItem");
        self.client
            .post_xml(&url, &[("name", safe_name.as_str())], config)
            .await?;

        info!("Created job {safe_name} in {}", self.folder_url);
        Ok(CreateOutcome::Created)
    }

    /// Deletes the job for `branch`. Failures are logged, never returned.
    pub async fn delete_job(&self, branch: &str) -> bool {
        let url = self.job_url(&url_safe_name(branch));
        self.delete_job_at(branch, &url).await
    }

    /// Deletes the job at `job_url`. Failures are logged, never returned.
    pub async fn delete_job_at(&self, branch: &str, job_url: &str) -> bool {
        match self.client.post(&join_url(job_url, "doDelete")).await {
            Ok(()) => {
                info!("Deleted job for branch {branch}");
                true
            }
            Err(e) => {
                warn!("Could not delete job {branch}: {e}");
                false
            }
        }
    }

    /// Reads the git branch configured in the job at `job_url`.
    pub async fn branch_from_config(&self, job_url: &str) -> Result<Option<String>> {
        let xml = self.client.get_text(&join_url(job_url, "config.xml")).await?;
        parse_branch_spec(&xml)
    }

    /// Branch jobs of this folder whose configured branch is not in `remote_branches`.
    ///
    /// Jobs without a git branch in their configuration are left alone.
    pub async fn find_deleted_branches(&self, remote_branches: &[String]) -> Result<Vec<StaleJob>> {
        let remote: HashSet<&str> = remote_branches.iter().map(String::as_str).collect();
        let mut stale = Vec::new();

        for url in &self.branch_job_urls {
            match self.branch_from_config(url).await? {
                Some(branch) if !remote.contains(branch.as_str()) => stale.push(StaleJob {
                    branch,
                    url: url.clone(),
                }),
                Some(_) => {}
                None => debug!("No git branch configured for {url}"),
            }
        }

        stale.sort_by(|a, b| a.branch.cmp(&b.branch));
        Ok(stale)
    }
}

/// Replaces each run of `/` or whitespace with `__`.
pub fn url_safe_name(name: &str) -> String {
    let mut safe = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c == '/' || c.is_whitespace() {
            if !in_run {
                safe.push_str("__");
                in_run = true;
            }
        } else {
            safe.push(c);
            in_run = false;
        }
    }
    safe
}

/// Substitutes every [`BRANCH_PLACEHOLDER`] in `template` with `branch`.
///
/// Works on raw bytes so templates in any ASCII-compatible encoding pass through untouched.
pub fn render_config(template: &[u8], branch: &str) -> Vec<u8> {
    let needle = BRANCH_PLACEHOLDER.as_bytes();
    let replacement = branch.as_bytes();
    let mut rendered = Vec::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        rendered.extend_from_slice(&rest[..pos]);
        rendered.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }
    rendered.extend_from_slice(rest);
    rendered
}

fn parse_branch_spec(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| JenkinsError::Xml(e.to_string()))?
        {
            Event::Start(start) => {
                path.push(String::from_utf8_lossy(start.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(text) if is_branch_spec(&path) => {
                let branch = text
                    .unescape()
                    .map_err(|e| JenkinsError::Xml(e.to_string()))?;
                return Ok(Some(branch.into_owned()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn is_branch_spec(path: &[String]) -> bool {
    path.len() == BRANCH_SPEC_PATH.len() + 1
        && path[1..]
            .iter()
            .zip(BRANCH_SPEC_PATH.iter())
            .all(|(a, b)| a == b)
}
