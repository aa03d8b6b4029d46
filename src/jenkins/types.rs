use serde::Deserialize;

/// Semantic kind of a Jenkins item, derived from its `_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    Folder,
    View,
    MultiBranchProject,
    WorkflowJob,
    /// Any class outside the known set, kept verbatim
    Unknown(String),
}

// Checked in order; the first substring contained in `_class` wins.
const KNOWN_CLASSES: [(&str, JobKind); 4] = [
    ("Folder", JobKind::Folder),
    ("ListView", JobKind::View),
    ("WorkflowMultiBranchProject", JobKind::MultiBranchProject),
    ("WorkflowJob", JobKind::WorkflowJob),
];

impl JobKind {
    /// Classifies a raw `_class` value such as
    /// `org.jenkinsci.plugins.workflow.job.WorkflowJob`.
    pub fn classify(class: &str) -> Self {
        KNOWN_CLASSES
            .iter()
            .find(|(needle, _)| class.contains(needle))
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| JobKind::Unknown(class.to_string()))
    }

    /// Folders, views and multi-branch projects contain further jobs.
    pub fn is_folder_like(&self) -> bool {
        matches!(
            self,
            JobKind::Folder | JobKind::View | JobKind::MultiBranchProject
        )
    }
}

/// A container of jobs: folder, view or multi-branch project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub url: String,
    /// Child job URLs in API response order
    pub jobs: Vec<String>,
}

/// A leaf job together with its builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub url: String,
    pub builds: Vec<Build>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Build {
    pub url: String,
    pub number: u64,
    #[serde(default)]
    pub building: bool,
}

/// A failed Jenkins request recorded for end-of-run reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status, absent when no response was received
    pub status: Option<u16>,
    pub text: String,
    pub url: String,
}

/// Reference to a child item as listed in a container's `jobs` array.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    pub url: String,
}

/// `GET {url}/api/json?tree=name,url,jobs[name,url]`
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerResponse {
    #[serde(rename = "_class")]
    pub class: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub jobs: Vec<JobRef>,
}

/// `GET {url}/api/json?depth=2&tree=name,url,builds[url,number,building]`
#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    #[serde(rename = "_class")]
    pub class: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub builds: Vec<Build>,
}
