use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::auth::Credentials;
use crate::config::{Config, Overrides, Settings};
use crate::git::BranchLister;
use crate::jenkins::{
    join_url, BranchJobs, BuildStopper, CreateOutcome, FolderWalker, JenkinsClient,
};
use crate::output::{failure, notice, print_failures, success, WalkProgress};

#[derive(Parser)]
#[command(name = "jenkins-helpers")]
#[command(author, version, about = "Jenkins branch job helpers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,
}

/// Connection flags shared by the job management commands.
#[derive(Args)]
struct ServerArgs {
    /// Jenkins user
    #[arg(short, long)]
    user: Option<String>,

    /// Jenkins API key for the user
    #[arg(long)]
    api_key: Option<String>,

    /// Jenkins base URL
    #[arg(short, long)]
    server: Option<String>,
}

impl ServerArgs {
    fn overrides(&self) -> Overrides<'_> {
        Overrides {
            server: self.server.as_deref(),
            user: self.user.as_deref(),
            secret: self.api_key.as_deref(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the job for a git branch from an XML template
    CreateJob {
        /// Git feature branch to build
        branch: String,

        /// Jenkins folder holding the branch jobs
        folder: Option<String>,

        #[command(flatten)]
        server: ServerArgs,

        /// XML config to base the job on; `{BRANCH_NAME}` is replaced with the branch
        #[arg(long = "config", value_name = "PATH")]
        template: PathBuf,
    },

    /// Delete the job of a git branch
    DeleteJob {
        /// Git branch whose job should go
        branch: String,

        /// Jenkins folder holding the branch jobs
        folder: Option<String>,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Delete jobs whose branch no longer exists in the repository
    PruneJobs {
        /// Git repository the branch jobs build
        repository: String,

        /// Jenkins folder holding the branch jobs
        folder: String,

        #[command(flatten)]
        server: ServerArgs,

        /// Only report the jobs that would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Stop running builds in Jenkins folders
    StopBuilds {
        /// Jenkins folders to search for builds to stop
        #[arg(required = true)]
        folders: Vec<String>,

        /// Url for the Jenkins instance
        #[arg(long)]
        base_url: Option<String>,

        /// Jenkins user name and password, separated by a ':'
        #[arg(short, long, value_name = "USER:PASSWORD")]
        user: Option<String>,

        /// Leave one running build per job untouched (the lowest-numbered one)
        #[arg(long)]
        keep_latest_build: bool,
    },
}

fn connect(settings: &Settings) -> Result<JenkinsClient> {
    info!(
        "Using Jenkins at {} ({:?})",
        settings.server.value, settings.server.source
    );
    let credentials = settings.credentials()?;
    Ok(JenkinsClient::new(&settings.server.value, credentials)?)
}

async fn branch_jobs<'a>(client: &'a JenkinsClient, folder: Option<&str>) -> Result<BranchJobs<'a>> {
    match folder {
        Some(folder) => BranchJobs::in_folder(client, folder)
            .await
            .with_context(|| format!("Failed to look up folder {folder}")),
        None => Ok(BranchJobs::top_level(client)),
    }
}

/// Branches to prune against, or why pruning must not happen.
///
/// An unknown or empty branch list would mark every job stale.
fn prunable_branches(
    repository: &str,
    branches: Option<Vec<String>>,
) -> std::result::Result<Vec<String>, String> {
    match branches {
        Some(branches) if !branches.is_empty() => Ok(branches),
        Some(_) => Err(format!("no branches found in {repository}")),
        None => Err(format!("branches of {repository} unknown")),
    }
}

/// Walks each folder in turn and stops its running builds.
///
/// Stop failures stay in `stopper`; a failed walk ends the run.
async fn stop_builds_in(
    client: &JenkinsClient,
    folders: &[String],
    stopper: &mut BuildStopper<'_>,
) -> Result<()> {
    let walker = FolderWalker::new(client);

    for folder in folders {
        let url = join_url(client.base_url(), folder);
        println!("Looking through {url}");

        let progress = WalkProgress::start();
        let jobs = match walker.collect_jobs(&url).await {
            Ok(jobs) => {
                progress.finish(jobs.len());
                jobs
            }
            Err(e) => {
                progress.abandon();
                return Err(e).with_context(|| format!("Failed to walk {url}"));
            }
        };

        for job in &jobs {
            stopper.stop_job(job).await;
        }
    }
    Ok(())
}

impl Cli {
    async fn execute_create_job(
        &self,
        config: &Config,
        branch: &str,
        folder: Option<&str>,
        server: &ServerArgs,
        template: &Path,
    ) -> Result<()> {
        let settings = Settings::resolve(server.overrides(), config);
        let client = connect(&settings)?;
        let jobs = branch_jobs(&client, folder).await?;

        let outcome = jobs
            .create_job(branch, template)
            .await
            .with_context(|| format!("Failed to create job for branch {branch}"))?;

        match outcome {
            CreateOutcome::Created => {
                println!("{}", success(format!("job for branch {branch} created")));
            }
            CreateOutcome::AlreadyExists => {
                println!("job for branch {branch} already exists");
            }
        }
        Ok(())
    }

    async fn execute_delete_job(
        &self,
        config: &Config,
        branch: &str,
        folder: Option<&str>,
        server: &ServerArgs,
    ) -> Result<()> {
        let settings = Settings::resolve(server.overrides(), config);
        let client = connect(&settings)?;
        let jobs = branch_jobs(&client, folder).await?;

        if jobs.delete_job(branch).await {
            println!("{}", success(format!("job for branch {branch} deleted")));
        } else {
            println!("{}", failure(format!("could not delete job {branch}")));
        }
        Ok(())
    }

    async fn execute_prune_jobs(
        &self,
        config: &Config,
        repository: &str,
        folder: &str,
        server: &ServerArgs,
        dry_run: bool,
    ) -> Result<()> {
        let settings = Settings::resolve(server.overrides(), config);
        let client = connect(&settings)?;

        let lister = BranchLister::new(repository, &settings.git)
            .context("Failed to create temporary git directory")?;
        let branches = match prunable_branches(repository, lister.get_branches().await) {
            Ok(branches) => branches,
            Err(refusal) => {
                warn!("{refusal}, refusing to prune");
                println!("{}", notice(format!("{refusal}, nothing pruned")));
                return Ok(());
            }
        };
        info!("{repository} has {} branches", branches.len());

        let jobs = branch_jobs(&client, Some(folder)).await?;
        info!("Checking branch jobs in {}", jobs.folder_url());
        let stale = jobs
            .find_deleted_branches(&branches)
            .await
            .with_context(|| format!("Failed to read branch jobs in {folder}"))?;

        if stale.is_empty() {
            println!("no jobs for deleted branches in {folder}");
        }

        for job in stale {
            if dry_run {
                println!("would delete job for branch {} ({})", job.branch, job.url);
            } else if jobs.delete_job_at(&job.branch, &job.url).await {
                println!("{}", success(format!("job for branch {} deleted", job.branch)));
            } else {
                println!("{}", failure(format!("could not delete job {}", job.branch)));
            }
        }
        Ok(())
    }

    async fn execute_stop_builds(
        &self,
        config: &Config,
        folders: &[String],
        base_url: Option<&str>,
        user: Option<&str>,
        keep_latest_build: bool,
    ) -> Result<()> {
        let credentials = user.map(Credentials::parse).transpose()?;
        let overrides = Overrides {
            server: base_url,
            user: credentials.as_ref().map(Credentials::user),
            secret: credentials.as_ref().map(Credentials::secret),
        };
        let settings = Settings::resolve(overrides, config);
        let client = connect(&settings)?;

        let mut stopper = BuildStopper::new(&client, keep_latest_build);
        let walked = stop_builds_in(&client, folders, &mut stopper).await;

        info!("Stopped {} builds", stopper.stopped());
        print_failures(stopper.errors());
        walked
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config_file.as_deref())?;

        match &self.command {
            Commands::CreateJob {
                branch,
                folder,
                server,
                template,
            } => {
                self.execute_create_job(&config, branch, folder.as_deref(), server, template)
                    .await
            }
            Commands::DeleteJob {
                branch,
                folder,
                server,
            } => {
                self.execute_delete_job(&config, branch, folder.as_deref(), server)
                    .await
            }
            Commands::PruneJobs {
                repository,
                folder,
                server,
                dry_run,
            } => {
                self.execute_prune_jobs(&config, repository, folder, server, *dry_run)
                    .await
            }
            Commands::StopBuilds {
                folders,
                base_url,
                user,
                keep_latest_build,
            } => {
                self.execute_stop_builds(
                    &config,
                    folders,
                    base_url.as_deref(),
                    user.as_deref(),
                    *keep_latest_build,
                )
                .await
            }
        }
    }
}
