use log::{info, warn};

use crate::error::JenkinsError;

use super::client::{join_url, JenkinsClient};
use super::types::{ApiFailure, Job};

/// URLs of the running builds of `job`, lowest build number first.
pub fn running_builds(job: &Job) -> Vec<String> {
    let mut running: Vec<_> = job.builds.iter().filter(|b| b.building).collect();
    running.sort_by_key(|b| b.number);
    running.into_iter().map(|b| b.url.clone()).collect()
}

/// Drops the first entry of an ascending list of running builds.
///
/// Note the retained build is the lowest-numbered one, not the newest.
pub fn skip_kept_build(mut builds: Vec<String>) -> Vec<String> {
    if !builds.is_empty() {
        builds.remove(0);
    }
    builds
}

/// Issues stop requests and remembers the ones Jenkins refused.
pub struct BuildStopper<'a> {
    client: &'a JenkinsClient,
    keep_latest_build: bool,
    stopped: usize,
    errors: Vec<ApiFailure>,
}

impl<'a> BuildStopper<'a> {
    pub fn new(client: &'a JenkinsClient, keep_latest_build: bool) -> Self {
        Self {
            client,
            keep_latest_build,
            stopped: 0,
            errors: Vec::new(),
        }
    }

    /// Builds of `job` that would be stopped.
    pub fn builds_to_stop(&self, job: &Job) -> Vec<String> {
        let builds = running_builds(job);
        if self.keep_latest_build {
            skip_kept_build(builds)
        } else {
            builds
        }
    }

    /// Stops the selected running builds of `job`; returns how many stop requests succeeded.
    pub async fn stop_job(&mut self, job: &Job) -> usize {
        let mut stopped = 0;
        for url in self.builds_to_stop(job) {
            if self.stop_build(&url).await {
                stopped += 1;
            }
        }
        stopped
    }

    /// POSTs `{url}/stop`. A failure is recorded, not returned.
    pub async fn stop_build(&mut self, url: &str) -> bool {
        println!("Stopping {url}");
        let stop_url = join_url(url, "stop");
        match self.client.post(&stop_url).await {
            Ok(()) => {
                info!("Stopped {url}");
                self.stopped += 1;
                true
            }
            Err(e) => {
                warn!("Failed to stop {url}: {e}");
                self.errors.push(failure_from(e, &stop_url));
                false
            }
        }
    }

    pub fn stopped(&self) -> usize {
        self.stopped
    }

    pub fn errors(&self) -> &[ApiFailure] {
        &self.errors
    }
}

fn failure_from(error: JenkinsError, url: &str) -> ApiFailure {
    match error {
        JenkinsError::Api {
            status,
            message,
            url,
        } => ApiFailure {
            status: Some(status),
            text: message,
            url,
        },
        other => ApiFailure {
            status: None,
            text: other.to_string(),
            url: url.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::types::Build;

    fn job_with(builds: &[(u64, bool)]) -> Job {
        Job {
            name: "app".to_string(),
            url: "https://ci/job/app/".to_string(),
            builds: builds
                .iter()
                .map(|&(number, building)| Build {
                    url: format!("https://ci/job/app/{number}/"),
                    number,
                    building,
                })
                .collect(),
        }
    }

    #[test]
    fn test_running_builds_sorted_ascending() {
        // Jenkins lists newest first.
        let job = job_with(&[(3, true), (2, false), (1, true)]);
        assert_eq!(
            running_builds(&job),
            vec!["https://ci/job/app/1/", "https://ci/job/app/3/"]
        );
    }

    #[test]
    fn test_keep_latest_build_drops_lowest_number() {
        let job = job_with(&[(1, true), (2, false), (3, true)]);
        let client = JenkinsClient::new("https://ci", None).unwrap();
        let stopper = BuildStopper::new(&client, true);
        assert_eq!(stopper.builds_to_stop(&job), vec!["https://ci/job/app/3/"]);
    }

    #[test]
    fn test_keep_latest_build_with_nothing_running() {
        assert!(skip_kept_build(Vec::new()).is_empty());
        let job = job_with(&[(1, false)]);
        let client = JenkinsClient::new("https://ci", None).unwrap();
        assert!(BuildStopper::new(&client, true).builds_to_stop(&job).is_empty());
    }

    #[test]
    fn test_sorting_is_numeric() {
        let job = job_with(&[(10, true), (9, true), (100, true)]);
        let numbers: Vec<String> = running_builds(&job);
        assert_eq!(
            numbers,
            vec![
                "https://ci/job/app/9/",
                "https://ci/job/app/10/",
                "https://ci/job/app/100/"
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_job_posts_and_records_failures() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let ok = server
            .mock("POST", "/job/app/1/stop")
            .with_status(200)
            .create_async()
            .await;
        let refused = server
            .mock("POST", "/job/app/3/stop")
            .with_status(403)
            .with_body("Forbidden")
            .create_async()
            .await;
        let untouched = server
            .mock("POST", "/job/app/2/stop")
            .expect(0)
            .create_async()
            .await;

        let job = Job {
            name: "app".to_string(),
            url: format!("{base}/job/app/"),
            builds: [(1, true), (2, false), (3, true)]
                .into_iter()
                .map(|(number, building)| Build {
                    url: format!("{base}/job/app/{number}/"),
                    number,
                    building,
                })
                .collect(),
        };

        let client = JenkinsClient::new(&base, None).unwrap();
        let mut stopper = BuildStopper::new(&client, false);
        let stopped = stopper.stop_job(&job).await;

        assert_eq!(stopped, 1);
        assert_eq!(stopper.stopped(), 1);
        assert_eq!(
            stopper.errors(),
            &[ApiFailure {
                status: Some(403),
                text: "Forbidden".to_string(),
                url: format!("{base}/job/app/3/stop"),
            }]
        );
        ok.assert_async().await;
        refused.assert_async().await;
        untouched.assert_async().await;
    }
}
