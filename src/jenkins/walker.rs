use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::error::{JenkinsError, Result};

use super::client::{join_url, JenkinsClient};
use super::types::{ContainerResponse, Folder, Job, JobKind, JobResponse};

const CONTAINER_TREE: &str = "name,url,jobs[name,url]";
const BUILDS_TREE: &str = "name,url,builds[url,number,building]";

/// Depth-first walk over a Jenkins folder hierarchy collecting leaf jobs.
pub struct FolderWalker<'a> {
    client: &'a JenkinsClient,
}

impl<'a> FolderWalker<'a> {
    pub fn new(client: &'a JenkinsClient) -> Self {
        Self { client }
    }

    async fn fetch_container(&self, url: &str) -> Result<(JobKind, Folder)> {
        let response: ContainerResponse = self
            .client
            .get_json(&join_url(url, "api/json"), &[("tree", CONTAINER_TREE)])
            .await?;

        let kind = JobKind::classify(&response.class);
        let folder = Folder {
            name: response.name,
            url: response.url,
            jobs: response.jobs.into_iter().map(|j| j.url).collect(),
        };
        Ok((kind, folder))
    }

    async fn fetch_job(&self, url: &str) -> Result<(JobKind, Job)> {
        let response: JobResponse = self
            .client
            .get_json(
                &join_url(url, "api/json"),
                &[("depth", "2"), ("tree", BUILDS_TREE)],
            )
            .await?;

        let kind = JobKind::classify(&response.class);
        let job = Job {
            name: response.name,
            url: response.url,
            builds: response.builds,
        };
        Ok((kind, job))
    }

    /// Fetches the starting point of a walk.
    ///
    /// A workflow job URL is wrapped in a nameless pseudo-folder holding only
    /// itself, so single jobs and folders are walked the same way.
    ///
    /// # Errors
    ///
    /// Returns [`JenkinsError::InvalidFolderType`] when `url` is neither
    /// folder-like nor a workflow job.
    pub async fn root_folder(&self, url: &str) -> Result<Folder> {
        let (kind, folder) = self.fetch_container(url).await?;
        match kind {
            JobKind::WorkflowJob => Ok(Folder {
                name: String::new(),
                url: String::new(),
                jobs: vec![url.to_string()],
            }),
            kind if kind.is_folder_like() => Ok(folder),
            JobKind::Unknown(class) => Err(JenkinsError::InvalidFolderType(class)),
            other => Err(JenkinsError::InvalidFolderType(format!("{other:?}"))),
        }
    }

    /// Collects every leaf job below `url`.
    ///
    /// Jobs come back in pre-order: children in API order, each folder's
    /// subtree fully walked before its next sibling. An item reachable through
    /// several containers (a view and its folder, say) is visited once.
    pub async fn collect_jobs(&self, url: &str) -> Result<Vec<Job>> {
        let root = self.root_folder(url).await?;
        debug!("Walking {:?} at {} ({} children)", root.name, root.url, root.jobs.len());
        let mut stack: Vec<VecDeque<String>> = vec![root.jobs.into()];
        let mut visited = HashSet::new();
        let mut jobs = Vec::new();

        while let Some(frame) = stack.last_mut() {
            let Some(child_url) = frame.pop_front() else {
                stack.pop();
                continue;
            };
            if !visited.insert(child_url.trim_end_matches('/').to_string()) {
                debug!("Skipping {child_url}, already visited");
                continue;
            }

            let (kind, job) = self.fetch_job(&child_url).await?;
            if kind.is_folder_like() {
                debug!("Descending into {kind:?} {child_url}");
                let (_, folder) = self.fetch_container(&child_url).await?;
                stack.push(folder.jobs.into());
            } else {
                debug!("Found job {} at {} with {} builds", job.name, job.url, job.builds.len());
                jobs.push(job);
            }
        }

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, ServerGuard};

    const FOLDER: &str = "com.cloudbees.hudson.plugins.folder.Folder";
    const VIEW: &str = "hudson.model.ListView";
    const MULTIBRANCH: &str = "org.jenkinsci.plugins.workflow.multibranch.WorkflowMultiBranchProject";
    const WORKFLOW: &str = "org.jenkinsci.plugins.workflow.job.WorkflowJob";

    /// Registers both the container view and the build view of one node.
    async fn node(
        server: &mut ServerGuard,
        path: &str,
        class: &str,
        children: &[&str],
        builds: &str,
    ) -> Vec<Mock> {
        let base = server.url();
        let name = path.rsplit('/').next().unwrap_or(path);
        let jobs: Vec<String> = children
            .iter()
            .map(|c| format!(r#"{{"name": "{c}", "url": "{base}{path}/job/{c}/"}}"#))
            .collect();
        let container = format!(
            r#"{{"_class": "{class}", "name": "{name}", "url": "{base}{path}/", "jobs": [{}]}}"#,
            jobs.join(",")
        );
        let job = format!(
            r#"{{"_class": "{class}", "name": "{name}", "url": "{base}{path}/", "builds": [{builds}]}}"#
        );
        let api = Matcher::Regex(format!("^{}/api/json", regex_escape(path)));

        let container_mock = server
            .mock("GET", api.clone())
            .match_query(Matcher::UrlEncoded("tree".into(), CONTAINER_TREE.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(container)
            .create_async()
            .await;
        let job_mock = server
            .mock("GET", api)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("depth".into(), "2".into()),
                Matcher::UrlEncoded("tree".into(), BUILDS_TREE.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(job)
            .create_async()
            .await;
        vec![container_mock, job_mock]
    }

    fn regex_escape(path: &str) -> String {
        path.replace('.', r"\.").replace('-', r"\-")
    }

    fn names(jobs: &[Job]) -> Vec<&str> {
        jobs.iter().map(|j| j.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_walk_mixed_tree_yields_each_leaf_once() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        // /job/root
        //   ├── /job/a          (view)
        //   │     ├── /job/a1   (workflow)
        //   │     └── /job/mb   (multibranch)
        //   │           └── /job/main (workflow)
        //   ├── /job/b          (workflow)
        //   └── /job/c          (folder)
        //         └── /job/c1   (freestyle, unknown class)
        mocks.extend(node(&mut server, "/job/root", FOLDER, &["a", "b", "c"], "").await);
        mocks.extend(node(&mut server, "/job/root/job/a", VIEW, &["a1", "mb"], "").await);
        mocks.extend(node(&mut server, "/job/root/job/a/job/a1", WORKFLOW, &[], "").await);
        mocks.extend(node(&mut server, "/job/root/job/a/job/mb", MULTIBRANCH, &["main"], "").await);
        mocks.extend(
            node(&mut server, "/job/root/job/a/job/mb/job/main", WORKFLOW, &[], "").await,
        );
        mocks.extend(node(&mut server, "/job/root/job/b", WORKFLOW, &[], "").await);
        mocks.extend(node(&mut server, "/job/root/job/c", FOLDER, &["c1"], "").await);
        mocks.extend(
            node(&mut server, "/job/root/job/c/job/c1", "hudson.model.FreeStyleProject", &[], "")
                .await,
        );

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let walker = FolderWalker::new(&client);
        let jobs = walker
            .collect_jobs(&format!("{}/job/root", server.url()))
            .await
            .unwrap();

        assert_eq!(names(&jobs), vec!["a1", "main", "b", "c1"]);
    }

    #[tokio::test]
    async fn test_job_listed_by_view_and_folder_is_collected_once() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let mut mocks = Vec::new();
        // /job/root
        //   ├── /view/v   (lists /job/root/job/x as well)
        //   └── /job/x    (workflow)
        let view_container = format!(
            r#"{{"_class": "{VIEW}", "name": "v", "url": "{base}/job/root/view/v/",
                "jobs": [{{"name": "x", "url": "{base}/job/root/job/x/"}}]}}"#
        );
        let view_job =
            format!(r#"{{"_class": "{VIEW}", "name": "v", "url": "{base}/job/root/view/v/"}}"#);
        let root_container = format!(
            r#"{{"_class": "{FOLDER}", "name": "root", "url": "{base}/job/root/",
                "jobs": [{{"name": "v", "url": "{base}/job/root/view/v/"}},
                         {{"name": "x", "url": "{base}/job/root/job/x"}}]}}"#
        );
        mocks.push(
            server
                .mock("GET", Matcher::Regex("^/job/root/api/json".to_string()))
                .match_query(Matcher::UrlEncoded("tree".into(), CONTAINER_TREE.into()))
                .with_status(200)
                .with_body(root_container)
                .create_async()
                .await,
        );
        mocks.push(
            server
                .mock("GET", Matcher::Regex("^/job/root/view/v/api/json".to_string()))
                .match_query(Matcher::UrlEncoded("tree".into(), CONTAINER_TREE.into()))
                .with_status(200)
                .with_body(view_container)
                .create_async()
                .await,
        );
        mocks.push(
            server
                .mock("GET", Matcher::Regex("^/job/root/view/v/api/json".to_string()))
                .match_query(Matcher::UrlEncoded("depth".into(), "2".into()))
                .with_status(200)
                .with_body(view_job)
                .create_async()
                .await,
        );
        mocks.extend(node(&mut server, "/job/root/job/x", WORKFLOW, &[], "").await);

        let client = JenkinsClient::new(&base, None).unwrap();
        let jobs = FolderWalker::new(&client)
            .collect_jobs(&format!("{base}/job/root"))
            .await
            .unwrap();

        assert_eq!(names(&jobs), vec!["x"]);
    }

    #[tokio::test]
    async fn test_walk_single_workflow_job() {
        let mut server = mockito::Server::new_async().await;
        let builds = r#"{"url": "http://ci/job/solo/1/", "number": 1, "building": true}"#;
        let _mocks = node(&mut server, "/job/solo", WORKFLOW, &[], builds).await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let walker = FolderWalker::new(&client);
        let url = format!("{}/job/solo", server.url());

        let root = walker.root_folder(&url).await.unwrap();
        assert_eq!(root.name, "");
        assert_eq!(root.jobs, vec![url.clone()]);

        let jobs = walker.collect_jobs(&url).await.unwrap();
        assert_eq!(names(&jobs), vec!["solo"]);
        assert_eq!(jobs[0].builds.len(), 1);
        assert!(jobs[0].builds[0].building);
    }

    #[tokio::test]
    async fn test_walk_rejects_unknown_root() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = node(&mut server, "/job/free", "hudson.model.FreeStyleProject", &[], "").await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let err = FolderWalker::new(&client)
            .collect_jobs(&format!("{}/job/free", server.url()))
            .await
            .unwrap_err();

        assert!(
            matches!(err, JenkinsError::InvalidFolderType(class) if class == "hudson.model.FreeStyleProject")
        );
    }

    #[tokio::test]
    async fn test_walk_propagates_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", Matcher::Regex("^/job/nope/api/json".to_string()))
            .with_status(404)
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let err = FolderWalker::new(&client)
            .collect_jobs(&format!("{}/job/nope", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, JenkinsError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_empty_folder_yields_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = node(&mut server, "/job/empty", FOLDER, &[], "").await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let jobs = FolderWalker::new(&client)
            .collect_jobs(&format!("{}/job/empty", server.url()))
            .await
            .unwrap();

        assert!(jobs.is_empty());
    }
}
